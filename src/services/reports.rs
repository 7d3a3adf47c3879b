//! Cross-cutting read models assembled from the live stores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Deps, OrNotFound};
use crate::error::{AppError, AppResult};
use crate::models::{
    Document, DocumentOwner, Driver, DriverStatus, FlowEntry, FlowFilter, Vehicle, VehicleStatus,
};
use crate::status::DocumentStatus;
use crate::store::DocumentScope;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct VehicleCounts {
    pub total: usize,
    pub active: usize,
    pub maintenance: usize,
    pub inactive: usize,
    pub assigned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DriverCounts {
    pub total: usize,
    pub active: usize,
    pub on_leave: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DocumentCounts {
    pub total: usize,
    pub valid: usize,
    pub expiring_30_days: usize,
    pub expired: usize,
    pub permanent: usize,
}

impl DocumentCounts {
    fn add(&mut self, status: DocumentStatus) {
        self.total += 1;
        match status {
            DocumentStatus::Valid => self.valid += 1,
            DocumentStatus::Expiring30Days => self.expiring_30_days += 1,
            DocumentStatus::Expired => self.expired += 1,
            DocumentStatus::Permanent => self.permanent += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FleetSummary {
    pub vehicles: VehicleCounts,
    pub drivers: DriverCounts,
    pub documents: DocumentCounts,
    pub pending_inspections: usize,
}

/// A document together with a readable name for its owner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OwnedDocument {
    #[serde(flatten)]
    pub document: Document,
    /// License plate or driver name
    pub owner_label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DriverProfile {
    pub driver: Driver,
    pub documents: Vec<Document>,
    pub flow_records: Vec<FlowEntry>,
    pub vehicle: Option<Vehicle>,
}

/// Optional `operation_time` window for the flow report.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct FlowWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl FlowWindow {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

#[derive(Clone)]
pub struct ReportAggregator {
    deps: Deps,
}

impl ReportAggregator {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn fleet_summary(&self) -> AppResult<FleetSummary> {
        let today = self.deps.clock.today();
        let vehicles = self.deps.store.list_vehicles().await?;
        let drivers = self.deps.store.list_drivers().await?;
        let documents = self.deps.store.list_documents(DocumentScope::All).await?;
        let pending = self.deps.store.list_pending(None).await?;

        let mut summary = FleetSummary {
            pending_inspections: pending.len(),
            ..Default::default()
        };

        for vehicle in &vehicles {
            let counts = &mut summary.vehicles;
            counts.total += 1;
            match vehicle.status {
                VehicleStatus::Active => counts.active += 1,
                VehicleStatus::Maintenance => counts.maintenance += 1,
                VehicleStatus::Inactive => counts.inactive += 1,
            }
            if vehicle.assigned_driver_id.is_some() {
                counts.assigned += 1;
            }
        }

        for driver in &drivers {
            let counts = &mut summary.drivers;
            counts.total += 1;
            match driver.status {
                DriverStatus::Active => counts.active += 1,
                DriverStatus::OnLeave => counts.on_leave += 1,
                DriverStatus::Inactive => counts.inactive += 1,
            }
        }

        for document in documents {
            summary
                .documents
                .add(document.with_live_status(today).current_status);
        }

        Ok(summary)
    }

    /// Expired and expiring documents of both owner kinds, soonest expiry first.
    pub async fn expiring_documents(&self) -> AppResult<Vec<OwnedDocument>> {
        let mut report: Vec<OwnedDocument> = self
            .labelled_documents()
            .await?
            .into_iter()
            .filter(|entry| entry.document.current_status.needs_attention())
            .collect();
        report.sort_by_key(|entry| entry.document.expiry_date);
        Ok(report)
    }

    /// Every document, vehicle papers by plate first, then driver papers by name.
    pub async fn all_documents(&self) -> AppResult<Vec<OwnedDocument>> {
        let mut report = self.labelled_documents().await?;
        report.sort_by(|a, b| {
            let rank = |entry: &OwnedDocument| match entry.document.owner {
                DocumentOwner::Vehicle(_) => 0,
                DocumentOwner::Driver(_) => 1,
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.owner_label.cmp(&b.owner_label))
        });
        Ok(report)
    }

    /// Three independent reads; no snapshot is shared between them.
    pub async fn driver_profile(&self, driver_id: Uuid) -> AppResult<DriverProfile> {
        let today = self.deps.clock.today();
        let driver = self
            .deps
            .store
            .get_driver(driver_id)
            .await?
            .or_not_found(format!("driver {driver_id}"))?;

        let documents = self
            .deps
            .store
            .list_documents(DocumentScope::Owner(DocumentOwner::Driver(driver_id)))
            .await?
            .into_iter()
            .map(|d| d.with_live_status(today))
            .collect();
        let flow_records = self
            .deps
            .store
            .list_flow_entries(FlowFilter::Driver(driver_id))
            .await?;
        let vehicle = self.deps.store.vehicle_for_driver(driver_id).await?;

        Ok(DriverProfile {
            driver,
            documents,
            flow_records,
            vehicle,
        })
    }

    pub async fn flow_report(&self, window: FlowWindow) -> AppResult<Vec<FlowEntry>> {
        let filter = match (window.start, window.end) {
            (Some(start), Some(end)) if start > end => {
                return Err(AppError::validation("start must not be after end"))
            }
            (Some(start), Some(end)) => FlowFilter::Between(start, end),
            _ => FlowFilter::All,
        };
        let entries = self.deps.store.list_flow_entries(filter).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| window.contains(entry.record.operation_time))
            .collect())
    }

    async fn labelled_documents(&self) -> AppResult<Vec<OwnedDocument>> {
        let today = self.deps.clock.today();
        let plates: HashMap<Uuid, String> = self
            .deps
            .store
            .list_vehicles()
            .await?
            .into_iter()
            .map(|v| (v.id, v.license_plate))
            .collect();
        let names: HashMap<Uuid, String> = self
            .deps
            .store
            .list_drivers()
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        Ok(self
            .deps
            .store
            .list_documents(DocumentScope::All)
            .await?
            .into_iter()
            .map(|document| {
                let label = match document.owner {
                    DocumentOwner::Vehicle(id) => plates.get(&id),
                    DocumentOwner::Driver(id) => names.get(&id),
                };
                OwnedDocument {
                    owner_label: label.cloned().unwrap_or_default(),
                    document: document.with_live_status(today),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn open_window_bounds_accept_everything_on_that_side() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert!(FlowWindow::default().contains(at));

        let after = FlowWindow {
            start: Some(at),
            end: None,
        };
        assert!(after.contains(at));
        assert!(!after.contains(at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn document_counts_bucket_by_status() {
        let mut counts = DocumentCounts::default();
        counts.add(DocumentStatus::Expired);
        counts.add(DocumentStatus::Expired);
        counts.add(DocumentStatus::Permanent);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.expired, 2);
        assert_eq!(counts.permanent, 1);
        assert_eq!(counts.valid, 0);
    }
}
