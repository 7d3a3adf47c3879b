//! Post-trip inspections, the pending-inspection queue and condition checks.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{optional_text, required_text, Deps, OrNotFound};
use crate::checklist::{assess, HorseChecklist, TrailerChecklist};
use crate::error::{AppError, AppResult};
use crate::models::{
    ConditionComponents, InspectionFields, InspectionStatus, NewConditionCheck, NewInspection,
    NewPendingInspection, PendingInspection, PendingStatus, PostTripInspection, TripType,
    Vehicle, VehicleConditionCheck, VehicleStatus,
};
use crate::outcome::{SideEffect, WithSideEffects};
use crate::store::InspectionFilter;

/// Window the inspection statistics cover.
const STATS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InspectionInput {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub trip_type: Option<TripType>,
    pub trip_destination: Option<String>,
    #[serde(default)]
    pub horse: HorseChecklist,
    #[serde(default)]
    pub trailer: TrailerChecklist,
    #[serde(default)]
    pub observations: Option<String>,
    /// Queue entry this inspection resolves
    #[serde(default)]
    pub pending_inspection_id: Option<Uuid>,
}

impl InspectionInput {
    fn fields(&self) -> AppResult<InspectionFields> {
        let vehicle_id = self
            .vehicle_id
            .ok_or_else(|| AppError::validation("vehicle_id is required"))?;
        let driver_id = self
            .driver_id
            .ok_or_else(|| AppError::validation("driver_id is required"))?;
        let trip_type = self
            .trip_type
            .ok_or_else(|| AppError::validation("trip_type is required"))?;
        let trip_destination =
            required_text(self.trip_destination.as_deref(), "trip_destination")?;

        Ok(InspectionFields {
            vehicle_id,
            driver_id,
            trip_type,
            trip_destination,
            horse: self.horse,
            trailer: self.trailer,
            observations: optional_text(self.observations.clone()),
        })
    }
}

/// Optional narrowing for inspection listings.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct InspectionQuery {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trip_type: Option<TripType>,
}

fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let to = end
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_default()
        .and_utc();
    (from, to)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct InspectionStats {
    pub total: usize,
    pub internal: usize,
    pub long_trip: usize,
    pub verified: usize,
    pub incomplete: usize,
    pub pending: usize,
    pub with_missing_documents: usize,
}

/// A vehicle that is due for an inspection.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueVehicle {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub last_inspection: Option<DateTime<Utc>>,
    pub days_since_inspection: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PendingInput {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub trip_type: Option<TripType>,
    pub trip_destination: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub arrival_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PendingSummary {
    pub total: usize,
    pub internal: usize,
    pub long_trip: usize,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConditionCheckInput {
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub components: ConditionComponents,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A condition check with the components found defective.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConditionReport {
    #[serde(flatten)]
    pub check: VehicleConditionCheck,
    pub defects: Vec<String>,
}

impl From<VehicleConditionCheck> for ConditionReport {
    fn from(check: VehicleConditionCheck) -> Self {
        let defects = check
            .components
            .defects()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self { check, defects }
    }
}

#[derive(Clone)]
pub struct InspectionRecorder {
    deps: Deps,
}

impl InspectionRecorder {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    async fn require_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.deps
            .store
            .get_vehicle(vehicle_id)
            .await?
            .or_not_found(format!("vehicle {vehicle_id}"))
    }

    async fn require_driver(&self, driver_id: Uuid) -> AppResult<()> {
        self.deps
            .store
            .get_driver(driver_id)
            .await?
            .map(|_| ())
            .or_not_found(format!("driver {driver_id}"))
    }

    // post-trip inspections

    /// Record an inspection; completeness is derived from the checklists.
    ///
    /// When the inspection resolves a queue entry, marking that entry
    /// inspected is a follow-up step that never undoes the inspection.
    pub async fn create(
        &self,
        input: InspectionInput,
        inspector_id: Option<Uuid>,
    ) -> AppResult<WithSideEffects<PostTripInspection>> {
        let fields = input.fields()?;
        self.require_vehicle(fields.vehicle_id).await?;
        self.require_driver(fields.driver_id).await?;

        let pending = match input.pending_inspection_id {
            Some(pending_id) => {
                let entry = self
                    .deps
                    .store
                    .get_pending(pending_id)
                    .await?
                    .or_not_found(format!("pending inspection {pending_id}"))?;
                if entry.status != PendingStatus::Pending {
                    return Err(AppError::validation(format!(
                        "pending inspection {pending_id} is already {:?}",
                        entry.status
                    )));
                }
                if entry.vehicle_id != fields.vehicle_id {
                    return Err(AppError::validation(
                        "pending inspection belongs to a different vehicle",
                    ));
                }
                Some(entry)
            }
            None => None,
        };

        let assessment = assess(&fields.horse, &fields.trailer);
        let now = self.deps.clock.now();
        let inspection = self
            .deps
            .store
            .insert_inspection(NewInspection {
                fields,
                inspector_id,
                documents_complete: assessment.documents_complete,
                missing_documents: assessment.missing_documents,
                status: assessment.status,
                inspection_date: now,
            })
            .await?;

        info!(
            inspection_id = %inspection.id,
            vehicle_id = %inspection.vehicle_id,
            status = ?inspection.status,
            "Post-trip inspection recorded"
        );

        let mut outcome = WithSideEffects::new(inspection);
        match pending {
            Some(entry) => {
                let result = self
                    .deps
                    .store
                    .set_pending_status(
                        entry.id,
                        PendingStatus::Inspected,
                        Some(outcome.value.id),
                        Some(now),
                    )
                    .await
                    .and_then(|updated| {
                        updated
                            .map(|_| ())
                            .or_not_found(format!("pending inspection {}", entry.id))
                    });
                outcome.record(SideEffect::ResolvePending, result);
            }
            None => outcome.skip(SideEffect::ResolvePending),
        }
        Ok(outcome)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PostTripInspection> {
        self.deps
            .store
            .get_inspection(id)
            .await?
            .or_not_found(format!("inspection {id}"))
    }

    pub async fn list(&self, query: InspectionQuery) -> AppResult<Vec<PostTripInspection>> {
        let filter = match (query.date, query.start_date, query.end_date) {
            (Some(date), _, _) => {
                let (from, to) = day_bounds(date, date);
                InspectionFilter::Between(from, to)
            }
            (None, Some(start), Some(end)) => {
                if start > end {
                    return Err(AppError::validation("start_date must not be after end_date"));
                }
                let (from, to) = day_bounds(start, end);
                InspectionFilter::Between(from, to)
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(AppError::validation(
                    "start_date and end_date must be given together",
                ))
            }
            (None, None, None) => match query.trip_type {
                Some(trip_type) => InspectionFilter::TripType(trip_type),
                None => InspectionFilter::All,
            },
        };

        let inspections = self.deps.store.list_inspections(filter).await?;
        Ok(match query.trip_type {
            Some(trip_type) => inspections
                .into_iter()
                .filter(|i| i.trip_type == trip_type)
                .collect(),
            None => inspections,
        })
    }

    pub async fn list_today(&self) -> AppResult<Vec<PostTripInspection>> {
        self.list(InspectionQuery {
            date: Some(self.deps.clock.today()),
            ..Default::default()
        })
        .await
    }

    pub async fn list_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<PostTripInspection>> {
        self.require_vehicle(vehicle_id).await?;
        self.deps
            .store
            .list_inspections(InspectionFilter::Vehicle(vehicle_id))
            .await
    }

    /// Rewrite the checklists and trip details; completeness is derived again.
    pub async fn update(&self, id: Uuid, input: InspectionInput) -> AppResult<PostTripInspection> {
        let current = self.get(id).await?;
        let fields = input.fields()?;
        self.require_vehicle(fields.vehicle_id).await?;
        self.require_driver(fields.driver_id).await?;

        let assessment = assess(&fields.horse, &fields.trailer);
        let updated = PostTripInspection {
            vehicle_id: fields.vehicle_id,
            driver_id: Some(fields.driver_id),
            trip_type: fields.trip_type,
            trip_destination: fields.trip_destination,
            horse: fields.horse,
            trailer: fields.trailer,
            observations: fields.observations,
            documents_complete: assessment.documents_complete,
            missing_documents: assessment.missing_documents,
            status: assessment.status,
            ..current
        };
        if !self.deps.store.save_inspection(&updated).await? {
            return Err(AppError::not_found(format!("inspection {id}")));
        }

        info!(inspection_id = %id, status = ?updated.status, "Post-trip inspection updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.deps.store.delete_inspection(id).await? {
            return Err(AppError::not_found(format!("inspection {id}")));
        }
        info!(inspection_id = %id, "Post-trip inspection deleted");
        Ok(())
    }

    /// Counts over the last 30 days.
    pub async fn stats(&self) -> AppResult<InspectionStats> {
        let now = self.deps.clock.now();
        let recent = self
            .deps
            .store
            .list_inspections(InspectionFilter::Between(
                now - Duration::days(STATS_WINDOW_DAYS),
                now,
            ))
            .await?;

        let count = |pred: &dyn Fn(&PostTripInspection) -> bool| recent.iter().filter(|i| pred(i)).count();
        Ok(InspectionStats {
            total: recent.len(),
            internal: count(&|i| i.trip_type == TripType::Internal),
            long_trip: count(&|i| i.trip_type == TripType::LongTrip),
            verified: count(&|i| i.status == InspectionStatus::Verified),
            incomplete: count(&|i| i.status == InspectionStatus::Incomplete),
            pending: count(&|i| i.status == InspectionStatus::Pending),
            with_missing_documents: count(&|i| !i.documents_complete),
        })
    }

    /// Active vehicles without an inspection of `trip_type` inside its period.
    pub async fn overdue(&self, trip_type: TripType) -> AppResult<Vec<OverdueVehicle>> {
        let now = self.deps.clock.now();
        let cutoff = now - Duration::days(trip_type.inspection_period_days());
        let inspections = self
            .deps
            .store
            .list_inspections(InspectionFilter::TripType(trip_type))
            .await?;

        Ok(self
            .deps
            .store
            .list_vehicles()
            .await?
            .into_iter()
            .filter(|v| v.status == VehicleStatus::Active)
            .filter_map(|vehicle| {
                // newest first, so the first match is the latest
                let last = inspections
                    .iter()
                    .find(|i| i.vehicle_id == vehicle.id)
                    .map(|i| i.inspection_date);
                match last {
                    Some(at) if at >= cutoff => None,
                    _ => Some(OverdueVehicle {
                        last_inspection: last,
                        days_since_inspection: last.map(|at| (now - at).num_days()),
                        vehicle,
                    }),
                }
            })
            .collect())
    }

    // pending queue

    /// Queue a vehicle for inspection. One open entry per vehicle.
    pub async fn enqueue(
        &self,
        input: PendingInput,
        created_by: Option<Uuid>,
    ) -> AppResult<PendingInspection> {
        let vehicle_id = input
            .vehicle_id
            .ok_or_else(|| AppError::validation("vehicle_id is required"))?;
        let trip_type = input
            .trip_type
            .ok_or_else(|| AppError::validation("trip_type is required"))?;
        let trip_destination =
            required_text(input.trip_destination.as_deref(), "trip_destination")?;
        self.require_vehicle(vehicle_id).await?;
        if let Some(driver_id) = input.driver_id {
            self.require_driver(driver_id).await?;
        }

        if self.deps.store.pending_for_vehicle(vehicle_id).await?.is_some() {
            return Err(AppError::conflict(
                "vehicle already has a pending inspection",
            ));
        }

        let now = self.deps.clock.now();
        let entry = self
            .deps
            .store
            .insert_pending(NewPendingInspection {
                vehicle_id,
                driver_id: input.driver_id,
                trip_type,
                trip_destination,
                notes: optional_text(input.notes),
                arrival_date: input.arrival_date.unwrap_or(now),
                created_by,
                created_at: now,
            })
            .await?;

        info!(pending_id = %entry.id, vehicle_id = %vehicle_id, "Vehicle queued for inspection");
        Ok(entry)
    }

    pub async fn get_pending(&self, id: Uuid) -> AppResult<PendingInspection> {
        self.deps
            .store
            .get_pending(id)
            .await?
            .or_not_found(format!("pending inspection {id}"))
    }

    pub async fn list_pending(&self, trip_type: Option<TripType>) -> AppResult<Vec<PendingInspection>> {
        self.deps.store.list_pending(trip_type).await
    }

    pub async fn mark_inspected(
        &self,
        id: Uuid,
        inspection_id: Option<Uuid>,
    ) -> AppResult<PendingInspection> {
        if let Some(inspection_id) = inspection_id {
            self.get(inspection_id).await?;
        }
        self.transition(id, PendingStatus::Inspected, inspection_id, Some(self.deps.clock.now()))
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<PendingInspection> {
        self.transition(id, PendingStatus::Cancelled, None, None).await
    }

    async fn transition(
        &self,
        id: Uuid,
        status: PendingStatus,
        inspection_id: Option<Uuid>,
        inspected_at: Option<DateTime<Utc>>,
    ) -> AppResult<PendingInspection> {
        let entry = self.get_pending(id).await?;
        if entry.status != PendingStatus::Pending {
            return Err(AppError::validation(format!(
                "pending inspection {id} is already {:?}",
                entry.status
            )));
        }

        let updated = self
            .deps
            .store
            .set_pending_status(id, status, inspection_id, inspected_at)
            .await?
            .or_not_found(format!("pending inspection {id}"))?;
        info!(pending_id = %id, status = ?status, "Pending inspection resolved");
        Ok(updated)
    }

    pub async fn delete_pending(&self, id: Uuid) -> AppResult<()> {
        if !self.deps.store.delete_pending(id).await? {
            return Err(AppError::not_found(format!("pending inspection {id}")));
        }
        info!(pending_id = %id, "Pending inspection deleted");
        Ok(())
    }

    pub async fn pending_summary(&self) -> AppResult<PendingSummary> {
        let open = self.deps.store.list_pending(None).await?;
        Ok(PendingSummary {
            total: open.len(),
            internal: open.iter().filter(|p| p.trip_type == TripType::Internal).count(),
            long_trip: open.iter().filter(|p| p.trip_type == TripType::LongTrip).count(),
        })
    }

    // condition checks

    pub async fn create_check(
        &self,
        input: ConditionCheckInput,
        created_by: Option<Uuid>,
    ) -> AppResult<ConditionReport> {
        let vehicle_id = input
            .vehicle_id
            .ok_or_else(|| AppError::validation("vehicle_id is required"))?;
        self.require_vehicle(vehicle_id).await?;
        if let Some(driver_id) = input.driver_id {
            self.require_driver(driver_id).await?;
        }

        let check = self
            .deps
            .store
            .insert_condition_check(NewConditionCheck {
                vehicle_id,
                driver_id: input.driver_id,
                components: input.components,
                notes: optional_text(input.notes),
                check_date: self.deps.clock.now(),
                created_by,
            })
            .await?;

        let report = ConditionReport::from(check);
        info!(
            check_id = %report.check.id,
            vehicle_id = %vehicle_id,
            defects = report.defects.len(),
            "Condition check recorded"
        );
        Ok(report)
    }

    pub async fn get_check(&self, id: Uuid) -> AppResult<ConditionReport> {
        self.deps
            .store
            .get_condition_check(id)
            .await?
            .map(ConditionReport::from)
            .or_not_found(format!("condition check {id}"))
    }

    pub async fn list_checks(&self, vehicle_id: Option<Uuid>) -> AppResult<Vec<ConditionReport>> {
        if let Some(vehicle_id) = vehicle_id {
            self.require_vehicle(vehicle_id).await?;
        }
        Ok(self
            .deps
            .store
            .list_condition_checks(vehicle_id)
            .await?
            .into_iter()
            .map(ConditionReport::from)
            .collect())
    }

    pub async fn latest_check(&self, vehicle_id: Uuid) -> AppResult<Option<ConditionReport>> {
        Ok(self.list_checks(Some(vehicle_id)).await?.into_iter().next())
    }

    pub async fn update_check(
        &self,
        id: Uuid,
        input: ConditionCheckInput,
    ) -> AppResult<ConditionReport> {
        let current = self
            .deps
            .store
            .get_condition_check(id)
            .await?
            .or_not_found(format!("condition check {id}"))?;
        let vehicle_id = input.vehicle_id.unwrap_or(current.vehicle_id);
        if vehicle_id != current.vehicle_id {
            self.require_vehicle(vehicle_id).await?;
        }
        if let Some(driver_id) = input.driver_id {
            self.require_driver(driver_id).await?;
        }

        let updated = VehicleConditionCheck {
            vehicle_id,
            driver_id: input.driver_id,
            components: input.components,
            notes: optional_text(input.notes),
            ..current
        };
        if !self.deps.store.save_condition_check(&updated).await? {
            return Err(AppError::not_found(format!("condition check {id}")));
        }
        info!(check_id = %id, "Condition check updated");
        Ok(updated.into())
    }

    pub async fn delete_check(&self, id: Uuid) -> AppResult<()> {
        if !self.deps.store.delete_condition_check(id).await? {
            return Err(AppError::not_found(format!("condition check {id}")));
        }
        info!(check_id = %id, "Condition check deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_fields_are_validation_errors() {
        let complete = InspectionInput {
            vehicle_id: Some(Uuid::new_v4()),
            driver_id: Some(Uuid::new_v4()),
            trip_type: Some(TripType::LongTrip),
            trip_destination: Some("Lusaka".to_string()),
            ..Default::default()
        };
        assert!(complete.fields().is_ok());

        let cases = [
            InspectionInput { vehicle_id: None, ..complete.clone() },
            InspectionInput { driver_id: None, ..complete.clone() },
            InspectionInput { trip_type: None, ..complete.clone() },
            InspectionInput { trip_destination: Some("   ".to_string()), ..complete.clone() },
        ];
        for input in cases {
            assert!(matches!(input.fields(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn day_bounds_cover_whole_days() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
        let (from, to) = day_bounds(date, date);
        assert_eq!(from.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert_eq!(to.date_naive(), date);
        assert!(to - from > Duration::hours(23));
    }
}
