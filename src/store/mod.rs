//! Relational store seams.
//!
//! Services only talk to these traits. `PgStore` backs production, the
//! in-memory store backs tests and demo runs; both enforce the same
//! uniqueness, reference and cascade rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Alert, Document, DocumentChanges, DocumentOwner, Driver, FileRef, FlowEntry, FlowFilter,
    FlowRecord, NewAlert, NewConditionCheck, NewDocument, NewDriver, NewFlowRecord, NewInspection,
    NewPendingInspection, NewVehicle, PendingInspection, PendingStatus, PostTripInspection,
    TripType, Vehicle, VehicleConditionCheck,
};
use crate::status::DocumentStatus;

pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::FaultPoint;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which documents a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    All,
    Owner(DocumentOwner),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionFilter {
    All,
    Vehicle(Uuid),
    TripType(TripType),
    /// Inclusive window on `inspection_date`
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl InspectionFilter {
    pub fn matches(&self, inspection: &PostTripInspection) -> bool {
        match *self {
            InspectionFilter::All => true,
            InspectionFilter::Vehicle(id) => inspection.vehicle_id == id,
            InspectionFilter::TripType(trip_type) => inspection.trip_type == trip_type,
            InspectionFilter::Between(start, end) => {
                inspection.inspection_date >= start && inspection.inspection_date <= end
            }
        }
    }
}

#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate license plate.
    async fn insert_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> AppResult<Vehicle>;

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    /// Ordered by license plate.
    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>>;

    async fn update_vehicle(
        &self,
        id: Uuid,
        changes: NewVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Vehicle>>;

    /// Removes the vehicle and everything hanging off it.
    async fn delete_vehicle(&self, id: Uuid) -> AppResult<bool>;

    /// Compare-and-set on the assigned driver.
    ///
    /// Returns `false` when the vehicle's current driver is not `expected`.
    /// Fails with `Conflict` when `new` already drives another vehicle.
    async fn swap_assigned_driver(
        &self,
        vehicle_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn vehicle_for_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>>;

    /// Returns how many vehicles were released.
    async fn clear_assignments_for_driver(
        &self,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
}

#[async_trait]
pub trait DriverStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate staff number.
    async fn insert_driver(&self, new: NewDriver, now: DateTime<Utc>) -> AppResult<Driver>;

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;

    /// Ordered by name.
    async fn list_drivers(&self) -> AppResult<Vec<Driver>>;

    async fn update_driver(
        &self,
        id: Uuid,
        changes: NewDriver,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>>;

    async fn set_profile_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>>;

    /// Fails with `Conflict` while a vehicle still points at the driver.
    async fn delete_driver(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate code and `Validation` when the
    /// owner does not exist.
    async fn insert_document(&self, new: NewDocument, now: DateTime<Utc>) -> AppResult<Document>;

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>>;

    /// Ordered by expiry date ascending, permanent documents last.
    async fn list_documents(&self, scope: DocumentScope) -> AppResult<Vec<Document>>;

    /// Codes of every document starting with `prefix`, whatever the owner.
    async fn codes_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>>;

    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>>;

    async fn set_document_file(
        &self,
        id: Uuid,
        file: Option<FileRef>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>>;

    /// Overwrites only the cached status column.
    async fn set_stored_status(&self, id: Uuid, status: DocumentStatus) -> AppResult<bool>;

    /// Removes the document with its flow records and alerts.
    async fn delete_document(&self, id: Uuid) -> AppResult<bool>;

    async fn insert_alert(&self, new: NewAlert, now: DateTime<Utc>) -> AppResult<Alert>;

    async fn list_alerts(&self, document_id: Uuid) -> AppResult<Vec<Alert>>;
}

#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fails with `Validation` when the document or driver does not exist.
    async fn insert_flow(&self, new: NewFlowRecord) -> AppResult<FlowRecord>;

    async fn get_flow(&self, id: Uuid) -> AppResult<Option<FlowRecord>>;

    /// Writes the mutable columns of `record`; the operation tag is left alone.
    async fn save_flow(&self, record: &FlowRecord) -> AppResult<bool>;

    async fn delete_flow(&self, id: Uuid) -> AppResult<bool>;

    async fn delete_flows_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<u64>;

    /// Newest `operation_time` first.
    async fn list_flow_entries(&self, filter: FlowFilter) -> AppResult<Vec<FlowEntry>>;
}

#[async_trait]
pub trait InspectionStore: Send + Sync {
    async fn insert_condition_check(
        &self,
        new: NewConditionCheck,
    ) -> AppResult<VehicleConditionCheck>;

    async fn get_condition_check(&self, id: Uuid) -> AppResult<Option<VehicleConditionCheck>>;

    /// Newest `check_date` first.
    async fn list_condition_checks(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<VehicleConditionCheck>>;

    async fn save_condition_check(&self, check: &VehicleConditionCheck) -> AppResult<bool>;

    async fn delete_condition_check(&self, id: Uuid) -> AppResult<bool>;

    async fn insert_inspection(&self, new: NewInspection) -> AppResult<PostTripInspection>;

    async fn get_inspection(&self, id: Uuid) -> AppResult<Option<PostTripInspection>>;

    /// Newest `inspection_date` first.
    async fn list_inspections(&self, filter: InspectionFilter)
        -> AppResult<Vec<PostTripInspection>>;

    async fn save_inspection(&self, inspection: &PostTripInspection) -> AppResult<bool>;

    async fn delete_inspection(&self, id: Uuid) -> AppResult<bool>;

    /// Fails with `Conflict` while the vehicle already has a pending entry.
    async fn insert_pending(&self, new: NewPendingInspection) -> AppResult<PendingInspection>;

    async fn get_pending(&self, id: Uuid) -> AppResult<Option<PendingInspection>>;

    async fn pending_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<PendingInspection>>;

    /// Entries still pending, newest arrival first.
    async fn list_pending(&self, trip_type: Option<TripType>) -> AppResult<Vec<PendingInspection>>;

    async fn set_pending_status(
        &self,
        id: Uuid,
        status: PendingStatus,
        inspection_id: Option<Uuid>,
        inspected_at: Option<DateTime<Utc>>,
    ) -> AppResult<Option<PendingInspection>>;

    async fn delete_pending(&self, id: Uuid) -> AppResult<bool>;
}

/// The whole relational collaborator.
pub trait FleetStore: VehicleStore + DriverStore + DocumentStore + FlowStore + InspectionStore {}

impl<T> FleetStore for T where
    T: VehicleStore + DriverStore + DocumentStore + FlowStore + InspectionStore
{
}
