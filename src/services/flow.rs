//! Append-only custody log for vehicle documents.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{optional_text, Deps, OrNotFound};
use crate::error::{AppError, AppResult};
use crate::models::{
    FlowEntry, FlowFilter, FlowRecord, FlowRecordChanges, NewFlowRecord, OperationType,
};

/// A flow record as submitted by a caller that chooses the operation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FlowRecordInput {
    pub document_id: Uuid,
    pub driver_id: Uuid,
    pub operation_type: OperationType,
    /// Defaults to now
    #[serde(default)]
    pub operation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_return_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_return_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Who holds a document right now, according to its latest flow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Custody {
    InStorage,
    CheckedOut {
        driver_id: Uuid,
        since: DateTime<Utc>,
        expected_return: Option<DateTime<Utc>>,
        overdue: bool,
    },
}

/// Fold a document's records into its custody state; the latest record wins.
pub fn fold_custody<'a>(
    records: impl IntoIterator<Item = &'a FlowRecord>,
    now: DateTime<Utc>,
) -> Custody {
    let latest = records
        .into_iter()
        .fold(None::<&FlowRecord>, |latest, record| match latest {
            Some(current) if current.operation_time >= record.operation_time => Some(current),
            _ => Some(record),
        });

    match latest {
        Some(record) if record.operation_type == OperationType::Withdrawal => Custody::CheckedOut {
            driver_id: record.driver_id,
            since: record.operation_time,
            expected_return: record.expected_return_time,
            overdue: record.expected_return_time.is_some_and(|due| due < now),
        },
        _ => Custody::InStorage,
    }
}

/// Flow records of one vehicle, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VehicleFlows {
    pub vehicle_id: Uuid,
    pub license_plate: String,
    pub vehicle_model: String,
    pub department: String,
    pub fleet: Option<String>,
    pub records: Vec<FlowEntry>,
}

/// Group entries (already newest first) by vehicle, ordered by plate.
pub fn group_by_vehicle(entries: Vec<FlowEntry>) -> Vec<VehicleFlows> {
    let mut groups: Vec<VehicleFlows> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|g| g.vehicle_id == entry.vehicle_id) {
            Some(group) => group.records.push(entry),
            None => groups.push(VehicleFlows {
                vehicle_id: entry.vehicle_id,
                license_plate: entry.license_plate.clone(),
                vehicle_model: entry.vehicle_model.clone(),
                department: entry.department.clone(),
                fleet: entry.fleet.clone(),
                records: vec![entry],
            }),
        }
    }
    groups.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
    groups
}

/// A document that is out with a driver.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OutstandingDocument {
    /// The withdrawal that took it out
    pub withdrawal: FlowEntry,
    pub overdue: bool,
}

#[derive(Clone)]
pub struct FlowLedger {
    deps: Deps,
}

impl FlowLedger {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn record_withdrawal(
        &self,
        document_id: Uuid,
        driver_id: Uuid,
        expected_return: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<FlowRecord> {
        self.append(NewFlowRecord {
            document_id,
            driver_id,
            operation_type: OperationType::Withdrawal,
            operation_time: self.deps.clock.now(),
            expected_return_time: expected_return,
            actual_return_time: None,
            notes: optional_text(notes),
        })
        .await
    }

    pub async fn record_return(
        &self,
        document_id: Uuid,
        driver_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<FlowRecord> {
        let now = self.deps.clock.now();
        self.append(NewFlowRecord {
            document_id,
            driver_id,
            operation_type: OperationType::Return,
            operation_time: now,
            expected_return_time: None,
            actual_return_time: Some(now),
            notes: optional_text(notes),
        })
        .await
    }

    pub async fn record(&self, input: FlowRecordInput) -> AppResult<FlowRecord> {
        let operation_time = input
            .operation_time
            .unwrap_or_else(|| self.deps.clock.now());
        self.append(NewFlowRecord {
            document_id: input.document_id,
            driver_id: input.driver_id,
            operation_type: input.operation_type,
            operation_time,
            expected_return_time: input.expected_return_time,
            actual_return_time: input.actual_return_time,
            notes: optional_text(input.notes),
        })
        .await
    }

    async fn append(&self, new: NewFlowRecord) -> AppResult<FlowRecord> {
        let document = self
            .deps
            .store
            .get_document(new.document_id)
            .await?
            .or_not_found(format!("document {}", new.document_id))?;
        if document.owner.vehicle_id().is_none() {
            return Err(AppError::validation(
                "flow records only track vehicle documents",
            ));
        }
        self.deps
            .store
            .get_driver(new.driver_id)
            .await?
            .or_not_found(format!("driver {}", new.driver_id))?;

        let record = self.deps.store.insert_flow(new).await?;
        info!(
            flow_record_id = %record.id,
            document_id = %record.document_id,
            driver_id = %record.driver_id,
            operation = ?record.operation_type,
            "Flow record appended"
        );
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<FlowRecord> {
        self.deps
            .store
            .get_flow(id)
            .await?
            .or_not_found(format!("flow record {id}"))
    }

    /// Edit a logged row. The operation tag and document stay as recorded.
    pub async fn update(&self, id: Uuid, changes: FlowRecordChanges) -> AppResult<FlowRecord> {
        let current = self.get(id).await?;
        let driver_id = changes.driver_id.unwrap_or(current.driver_id);
        if driver_id != current.driver_id {
            self.deps
                .store
                .get_driver(driver_id)
                .await?
                .or_not_found(format!("driver {driver_id}"))?;
        }

        let updated = FlowRecord {
            driver_id,
            expected_return_time: changes.expected_return_time,
            actual_return_time: changes.actual_return_time,
            notes: optional_text(changes.notes),
            ..current
        };
        if !self.deps.store.save_flow(&updated).await? {
            return Err(AppError::not_found(format!("flow record {id}")));
        }

        info!(flow_record_id = %id, "Flow record updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.deps.store.delete_flow(id).await? {
            return Err(AppError::not_found(format!("flow record {id}")));
        }
        info!(flow_record_id = %id, "Flow record deleted");
        Ok(())
    }

    pub async fn delete_all_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<u64> {
        self.deps
            .store
            .get_vehicle(vehicle_id)
            .await?
            .or_not_found(format!("vehicle {vehicle_id}"))?;
        let removed = self.deps.store.delete_flows_for_vehicle(vehicle_id).await?;
        info!(vehicle_id = %vehicle_id, removed, "Vehicle flow records cleared");
        Ok(removed)
    }

    pub async fn list_all(&self) -> AppResult<Vec<FlowEntry>> {
        self.deps.store.list_flow_entries(FlowFilter::All).await
    }

    /// Only vehicles with at least one record appear.
    pub async fn grouped_by_vehicle(&self) -> AppResult<Vec<VehicleFlows>> {
        Ok(group_by_vehicle(self.list_all().await?))
    }

    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<FlowEntry>> {
        self.deps
            .store
            .get_vehicle(vehicle_id)
            .await?
            .or_not_found(format!("vehicle {vehicle_id}"))?;
        self.deps
            .store
            .list_flow_entries(FlowFilter::Vehicle(vehicle_id))
            .await
    }

    pub async fn list_by_document(&self, document_id: Uuid) -> AppResult<Vec<FlowEntry>> {
        self.deps
            .store
            .get_document(document_id)
            .await?
            .or_not_found(format!("document {document_id}"))?;
        self.deps
            .store
            .list_flow_entries(FlowFilter::Document(document_id))
            .await
    }

    pub async fn list_by_driver(&self, driver_id: Uuid) -> AppResult<Vec<FlowEntry>> {
        self.deps
            .store
            .get_driver(driver_id)
            .await?
            .or_not_found(format!("driver {driver_id}"))?;
        self.deps
            .store
            .list_flow_entries(FlowFilter::Driver(driver_id))
            .await
    }

    /// Entries whose `operation_time` falls inside `[start, end]`.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<FlowEntry>> {
        if start > end {
            return Err(AppError::validation("start must not be after end"));
        }
        self.deps
            .store
            .list_flow_entries(FlowFilter::Between(start, end))
            .await
    }

    pub async fn custody(&self, document_id: Uuid) -> AppResult<Custody> {
        let entries = self.list_by_document(document_id).await?;
        Ok(fold_custody(
            entries.iter().map(|entry| &entry.record),
            self.deps.clock.now(),
        ))
    }

    /// Every document whose latest record is a withdrawal.
    pub async fn outstanding(&self) -> AppResult<Vec<OutstandingDocument>> {
        let now = self.deps.clock.now();
        let mut seen = HashSet::new();
        let mut outstanding = Vec::new();

        // entries arrive newest first, so the first one per document is its latest
        for entry in self.list_all().await? {
            if !seen.insert(entry.record.document_id) {
                continue;
            }
            let custody = fold_custody([&entry.record], now);
            if let Custody::CheckedOut { overdue, .. } = custody {
                outstanding.push(OutstandingDocument {
                    withdrawal: entry,
                    overdue,
                });
            }
        }
        Ok(outstanding)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).single().expect("valid time")
    }

    fn record(operation_type: OperationType, hour: u32, driver_id: Uuid) -> FlowRecord {
        FlowRecord {
            id: Uuid::new_v4(),
            document_id: Uuid::nil(),
            driver_id,
            operation_type,
            operation_time: at(hour),
            expected_return_time: None,
            actual_return_time: None,
            notes: None,
        }
    }

    #[test]
    fn no_history_means_in_storage() {
        let history: Vec<FlowRecord> = Vec::new();
        assert_eq!(fold_custody(&history, at(12)), Custody::InStorage);
    }

    #[test]
    fn latest_record_wins_regardless_of_input_order() {
        let driver = Uuid::new_v4();
        let returned = record(OperationType::Return, 11, driver);
        let taken = record(OperationType::Withdrawal, 9, driver);
        assert_eq!(fold_custody(&[taken.clone(), returned.clone()], at(12)), Custody::InStorage);
        assert_eq!(fold_custody(&[returned, taken], at(12)), Custody::InStorage);
    }

    #[test]
    fn duplicate_withdrawals_follow_the_newest() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let records = [
            record(OperationType::Withdrawal, 8, first),
            record(OperationType::Withdrawal, 10, second),
        ];
        match fold_custody(&records, at(12)) {
            Custody::CheckedOut { driver_id, since, .. } => {
                assert_eq!(driver_id, second);
                assert_eq!(since, at(10));
            }
            other => panic!("expected checked out, got {other:?}"),
        }
    }

    #[test]
    fn withdrawal_past_its_expected_return_is_overdue() {
        let mut taken = record(OperationType::Withdrawal, 8, Uuid::new_v4());
        taken.expected_return_time = Some(at(10));

        let on_time = fold_custody([&taken], at(9));
        assert!(matches!(on_time, Custody::CheckedOut { overdue: false, .. }));

        let late = fold_custody([&taken], at(10) + Duration::minutes(1));
        assert!(matches!(late, Custody::CheckedOut { overdue: true, .. }));
    }
}
