//! Process-local store with the same rules as the Postgres schema.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    DocumentScope, DocumentStore, DriverStore, FlowStore, InspectionFilter, InspectionStore,
    VehicleStore,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Alert, Document, DocumentChanges, DocumentOwner, Driver, FileRef, FlowEntry, FlowFilter,
    FlowRecord, NewAlert, NewConditionCheck, NewDocument, NewDriver, NewFlowRecord, NewInspection,
    NewPendingInspection, NewVehicle, PendingInspection, PendingStatus, PostTripInspection,
    TripType, Vehicle, VehicleConditionCheck,
};
use crate::status::DocumentStatus;

/// Store operations that can be told to fail, for exercising best-effort paths.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertAlert,
    SetPendingStatus,
    SetDocumentFile,
}

#[derive(Default)]
struct Tables {
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    documents: HashMap<Uuid, Document>,
    // insertion order breaks ties between equal timestamps
    alerts: Vec<Alert>,
    flows: Vec<FlowRecord>,
    checks: Vec<VehicleConditionCheck>,
    inspections: Vec<PostTripInspection>,
    pending: Vec<PendingInspection>,
}

impl Tables {
    fn require_vehicle(&self, id: Uuid) -> AppResult<()> {
        if self.vehicles.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::validation(format!("vehicle {id} does not exist")))
        }
    }

    fn require_driver(&self, id: Uuid) -> AppResult<()> {
        if self.drivers.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::validation(format!("driver {id} does not exist")))
        }
    }

    fn require_owner(&self, owner: DocumentOwner) -> AppResult<()> {
        match owner {
            DocumentOwner::Vehicle(id) => self.require_vehicle(id),
            DocumentOwner::Driver(id) => self.require_driver(id),
        }
    }

    fn plate_taken(&self, plate: &str, except: Option<Uuid>) -> bool {
        self.vehicles
            .values()
            .any(|v| v.license_plate == plate && Some(v.id) != except)
    }

    fn staff_no_taken(&self, staff_no: &str, except: Option<Uuid>) -> bool {
        self.drivers
            .values()
            .any(|d| d.staff_no == staff_no && Some(d.id) != except)
    }

    fn remove_document(&mut self, id: Uuid) -> bool {
        if self.documents.remove(&id).is_none() {
            return false;
        }
        self.flows.retain(|f| f.document_id != id);
        self.alerts.retain(|a| a.document_id != id);
        true
    }

    fn remove_owned_documents(&mut self, owner: DocumentOwner) {
        let owned: Vec<Uuid> = self
            .documents
            .values()
            .filter(|d| d.owner == owner)
            .map(|d| d.id)
            .collect();
        for id in owned {
            self.remove_document(id);
        }
    }

    fn flow_entry(&self, record: &FlowRecord) -> Option<FlowEntry> {
        let document = self.documents.get(&record.document_id)?;
        let vehicle = self.vehicles.get(&document.owner.vehicle_id()?)?;
        let driver = self.drivers.get(&record.driver_id)?;
        Some(FlowEntry {
            record: record.clone(),
            document_code: document.code.clone(),
            document_name: document.name.clone(),
            document_type: document.doc_type,
            vehicle_id: vehicle.id,
            license_plate: vehicle.license_plate.clone(),
            vehicle_model: vehicle.model.clone(),
            department: vehicle.department.clone(),
            fleet: vehicle.fleet.clone(),
            driver_name: driver.name.clone(),
            staff_no: driver.staff_no.clone(),
        })
    }
}

/// In-memory [`super::FleetStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    #[cfg(any(test, feature = "test-util"))]
    faults: Mutex<HashSet<FaultPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call at `point` fail until [`MemoryStore::clear_faults`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn inject_fault(&self, point: FaultPoint) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(point);
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(any(test, feature = "test-util"))]
    fn check_fault(&self, point: FaultPoint) -> AppResult<()> {
        let armed = self
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&point);
        if armed {
            Err(AppError::Other(anyhow::anyhow!("injected fault at {point:?}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn insert_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> AppResult<Vehicle> {
        let mut t = self.tables();
        if t.plate_taken(&new.license_plate, None) {
            return Err(AppError::conflict(format!(
                "license plate {} is already registered",
                new.license_plate
            )));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            license_plate: new.license_plate,
            model: new.model,
            department: new.department,
            fleet: new.fleet,
            color: new.color,
            status: new.status,
            assigned_driver_id: None,
            created_at: now,
            updated_at: now,
        };
        t.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.tables().vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.tables().vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        changes: NewVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Vehicle>> {
        let mut t = self.tables();
        if t.plate_taken(&changes.license_plate, Some(id)) {
            return Err(AppError::conflict(format!(
                "license plate {} is already registered",
                changes.license_plate
            )));
        }

        let Some(vehicle) = t.vehicles.get_mut(&id) else {
            return Ok(None);
        };
        vehicle.license_plate = changes.license_plate;
        vehicle.model = changes.model;
        vehicle.department = changes.department;
        vehicle.fleet = changes.fleet;
        vehicle.color = changes.color;
        vehicle.status = changes.status;
        vehicle.updated_at = now;
        Ok(Some(vehicle.clone()))
    }

    async fn delete_vehicle(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        if t.vehicles.remove(&id).is_none() {
            return Ok(false);
        }
        t.remove_owned_documents(DocumentOwner::Vehicle(id));
        t.checks.retain(|c| c.vehicle_id != id);
        t.inspections.retain(|i| i.vehicle_id != id);
        t.pending.retain(|p| p.vehicle_id != id);
        Ok(true)
    }

    async fn swap_assigned_driver(
        &self,
        vehicle_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut t = self.tables();
        if !t.vehicles.contains_key(&vehicle_id) {
            return Err(AppError::not_found(format!("vehicle {vehicle_id}")));
        }
        if let Some(driver_id) = new {
            t.require_driver(driver_id)?;
            let elsewhere = t
                .vehicles
                .values()
                .any(|v| v.id != vehicle_id && v.assigned_driver_id == Some(driver_id));
            if elsewhere {
                return Err(AppError::conflict(format!(
                    "driver {driver_id} is already assigned to another vehicle"
                )));
            }
        }

        let Some(vehicle) = t.vehicles.get_mut(&vehicle_id) else {
            return Ok(false);
        };
        if vehicle.assigned_driver_id != expected {
            return Ok(false);
        }
        vehicle.assigned_driver_id = new;
        vehicle.updated_at = now;
        Ok(true)
    }

    async fn vehicle_for_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self
            .tables()
            .vehicles
            .values()
            .find(|v| v.assigned_driver_id == Some(driver_id))
            .cloned())
    }

    async fn clear_assignments_for_driver(
        &self,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut t = self.tables();
        let mut cleared = 0;
        for vehicle in t
            .vehicles
            .values_mut()
            .filter(|v| v.assigned_driver_id == Some(driver_id))
        {
            vehicle.assigned_driver_id = None;
            vehicle.updated_at = now;
            cleared += 1;
        }
        Ok(cleared)
    }
}

#[async_trait]
impl DriverStore for MemoryStore {
    async fn insert_driver(&self, new: NewDriver, now: DateTime<Utc>) -> AppResult<Driver> {
        let mut t = self.tables();
        if t.staff_no_taken(&new.staff_no, None) {
            return Err(AppError::conflict(format!(
                "staff number {} is already registered",
                new.staff_no
            )));
        }

        let driver = Driver {
            id: Uuid::new_v4(),
            staff_no: new.staff_no,
            name: new.name,
            contact: new.contact,
            alternative_contact: new.alternative_contact,
            contact_malawi: new.contact_malawi,
            contact_zambia: new.contact_zambia,
            contact_zimbabwe: new.contact_zimbabwe,
            date_of_birth: new.date_of_birth,
            sex: new.sex,
            driver_license_number: new.driver_license_number,
            driver_license_expiry: new.driver_license_expiry,
            position: new.position,
            department: new.department,
            fleet: new.fleet,
            notes: new.notes,
            status: new.status,
            profile_photo: None,
            created_at: now,
            updated_at: now,
        };
        t.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.tables().drivers.get(&id).cloned())
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        let mut drivers: Vec<Driver> = self.tables().drivers.values().cloned().collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.staff_no.cmp(&b.staff_no)));
        Ok(drivers)
    }

    async fn update_driver(
        &self,
        id: Uuid,
        changes: NewDriver,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>> {
        let mut t = self.tables();
        if t.staff_no_taken(&changes.staff_no, Some(id)) {
            return Err(AppError::conflict(format!(
                "staff number {} is already registered",
                changes.staff_no
            )));
        }

        let Some(driver) = t.drivers.get_mut(&id) else {
            return Ok(None);
        };
        driver.staff_no = changes.staff_no;
        driver.name = changes.name;
        driver.contact = changes.contact;
        driver.alternative_contact = changes.alternative_contact;
        driver.contact_malawi = changes.contact_malawi;
        driver.contact_zambia = changes.contact_zambia;
        driver.contact_zimbabwe = changes.contact_zimbabwe;
        driver.date_of_birth = changes.date_of_birth;
        driver.sex = changes.sex;
        driver.driver_license_number = changes.driver_license_number;
        driver.driver_license_expiry = changes.driver_license_expiry;
        driver.position = changes.position;
        driver.department = changes.department;
        driver.fleet = changes.fleet;
        driver.notes = changes.notes;
        driver.status = changes.status;
        driver.updated_at = now;
        Ok(Some(driver.clone()))
    }

    async fn set_profile_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>> {
        let mut t = self.tables();
        let Some(driver) = t.drivers.get_mut(&id) else {
            return Ok(None);
        };
        driver.profile_photo = photo;
        driver.updated_at = now;
        Ok(Some(driver.clone()))
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        if !t.drivers.contains_key(&id) {
            return Ok(false);
        }
        if t.vehicles.values().any(|v| v.assigned_driver_id == Some(id)) {
            return Err(AppError::conflict("driver has assigned vehicle"));
        }

        t.drivers.remove(&id);
        t.remove_owned_documents(DocumentOwner::Driver(id));
        t.flows.retain(|f| f.driver_id != id);
        for check in t.checks.iter_mut().filter(|c| c.driver_id == Some(id)) {
            check.driver_id = None;
        }
        for inspection in t.inspections.iter_mut().filter(|i| i.driver_id == Some(id)) {
            inspection.driver_id = None;
        }
        for entry in t.pending.iter_mut().filter(|p| p.driver_id == Some(id)) {
            entry.driver_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, new: NewDocument, now: DateTime<Utc>) -> AppResult<Document> {
        let mut t = self.tables();
        t.require_owner(new.owner)?;
        if t.documents.values().any(|d| d.code == new.code) {
            return Err(AppError::conflict(format!(
                "document code {} already exists",
                new.code
            )));
        }

        let document = Document {
            id: Uuid::new_v4(),
            code: new.code,
            owner: new.owner,
            name: new.name,
            doc_type: new.doc_type,
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            current_status: new.current_status,
            storage_location: new.storage_location,
            notes: new.notes,
            file: new.file,
            created_at: now,
            updated_at: now,
        };
        t.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        Ok(self.tables().documents.get(&id).cloned())
    }

    async fn list_documents(&self, scope: DocumentScope) -> AppResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .tables()
            .documents
            .values()
            .filter(|d| match scope {
                DocumentScope::All => true,
                DocumentScope::Owner(owner) => d.owner == owner,
            })
            .cloned()
            .collect();
        documents.sort_by(|a, b| {
            (a.expiry_date.is_none(), a.expiry_date, &a.code)
                .cmp(&(b.expiry_date.is_none(), b.expiry_date, &b.code))
        });
        Ok(documents)
    }

    async fn codes_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        Ok(self
            .tables()
            .documents
            .values()
            .filter(|d| d.code.starts_with(prefix))
            .map(|d| d.code.clone())
            .collect())
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>> {
        let mut t = self.tables();
        let Some(document) = t.documents.get_mut(&id) else {
            return Ok(None);
        };
        document.name = changes.name;
        document.doc_type = changes.doc_type;
        document.issue_date = changes.issue_date;
        document.expiry_date = changes.expiry_date;
        document.current_status = changes.current_status;
        document.storage_location = changes.storage_location;
        document.notes = changes.notes;
        document.updated_at = now;
        Ok(Some(document.clone()))
    }

    async fn set_document_file(
        &self,
        id: Uuid,
        file: Option<FileRef>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>> {
        #[cfg(any(test, feature = "test-util"))]
        self.check_fault(FaultPoint::SetDocumentFile)?;
        let mut t = self.tables();
        let Some(document) = t.documents.get_mut(&id) else {
            return Ok(None);
        };
        document.file = file;
        document.updated_at = now;
        Ok(Some(document.clone()))
    }

    async fn set_stored_status(&self, id: Uuid, status: DocumentStatus) -> AppResult<bool> {
        let mut t = self.tables();
        let Some(document) = t.documents.get_mut(&id) else {
            return Ok(false);
        };
        document.current_status = status;
        Ok(true)
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables().remove_document(id))
    }

    async fn insert_alert(&self, new: NewAlert, now: DateTime<Utc>) -> AppResult<Alert> {
        #[cfg(any(test, feature = "test-util"))]
        self.check_fault(FaultPoint::InsertAlert)?;
        let mut t = self.tables();
        if !t.documents.contains_key(&new.document_id) {
            return Err(AppError::validation(format!(
                "document {} does not exist",
                new.document_id
            )));
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            alert_type: new.alert_type,
            alert_date: new.alert_date,
            created_at: now,
        };
        t.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_alerts(&self, document_id: Uuid) -> AppResult<Vec<Alert>> {
        Ok(self
            .tables()
            .alerts
            .iter()
            .filter(|a| a.document_id == document_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FlowStore for MemoryStore {
    async fn insert_flow(&self, new: NewFlowRecord) -> AppResult<FlowRecord> {
        let mut t = self.tables();
        if !t.documents.contains_key(&new.document_id) {
            return Err(AppError::validation(format!(
                "document {} does not exist",
                new.document_id
            )));
        }
        t.require_driver(new.driver_id)?;

        let record = FlowRecord {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            driver_id: new.driver_id,
            operation_type: new.operation_type,
            operation_time: new.operation_time,
            expected_return_time: new.expected_return_time,
            actual_return_time: new.actual_return_time,
            notes: new.notes,
        };
        t.flows.push(record.clone());
        Ok(record)
    }

    async fn get_flow(&self, id: Uuid) -> AppResult<Option<FlowRecord>> {
        Ok(self.tables().flows.iter().find(|f| f.id == id).cloned())
    }

    async fn save_flow(&self, record: &FlowRecord) -> AppResult<bool> {
        let mut t = self.tables();
        t.require_driver(record.driver_id)?;
        let Some(stored) = t.flows.iter_mut().find(|f| f.id == record.id) else {
            return Ok(false);
        };
        stored.driver_id = record.driver_id;
        stored.expected_return_time = record.expected_return_time;
        stored.actual_return_time = record.actual_return_time;
        stored.notes = record.notes.clone();
        Ok(true)
    }

    async fn delete_flow(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.flows.len();
        t.flows.retain(|f| f.id != id);
        Ok(t.flows.len() != before)
    }

    async fn delete_flows_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<u64> {
        let mut t = self.tables();
        let owned: HashSet<Uuid> = t
            .documents
            .values()
            .filter(|d| d.owner == DocumentOwner::Vehicle(vehicle_id))
            .map(|d| d.id)
            .collect();
        let before = t.flows.len();
        t.flows.retain(|f| !owned.contains(&f.document_id));
        Ok((before - t.flows.len()) as u64)
    }

    async fn list_flow_entries(&self, filter: FlowFilter) -> AppResult<Vec<FlowEntry>> {
        let t = self.tables();
        let mut entries: Vec<FlowEntry> = t
            .flows
            .iter()
            .rev()
            .filter_map(|record| t.flow_entry(record))
            .filter(|entry| filter.matches(entry))
            .collect();
        entries.sort_by(|a, b| b.record.operation_time.cmp(&a.record.operation_time));
        Ok(entries)
    }
}

#[async_trait]
impl InspectionStore for MemoryStore {
    async fn insert_condition_check(
        &self,
        new: NewConditionCheck,
    ) -> AppResult<VehicleConditionCheck> {
        let mut t = self.tables();
        t.require_vehicle(new.vehicle_id)?;
        if let Some(driver_id) = new.driver_id {
            t.require_driver(driver_id)?;
        }

        let check = VehicleConditionCheck {
            id: Uuid::new_v4(),
            vehicle_id: new.vehicle_id,
            driver_id: new.driver_id,
            components: new.components,
            notes: new.notes,
            check_date: new.check_date,
            created_by: new.created_by,
        };
        t.checks.push(check.clone());
        Ok(check)
    }

    async fn get_condition_check(&self, id: Uuid) -> AppResult<Option<VehicleConditionCheck>> {
        Ok(self.tables().checks.iter().find(|c| c.id == id).cloned())
    }

    async fn list_condition_checks(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<VehicleConditionCheck>> {
        let mut checks: Vec<VehicleConditionCheck> = self
            .tables()
            .checks
            .iter()
            .rev()
            .filter(|c| vehicle_id.map_or(true, |id| c.vehicle_id == id))
            .cloned()
            .collect();
        checks.sort_by(|a, b| b.check_date.cmp(&a.check_date));
        Ok(checks)
    }

    async fn save_condition_check(&self, check: &VehicleConditionCheck) -> AppResult<bool> {
        let mut t = self.tables();
        t.require_vehicle(check.vehicle_id)?;
        if let Some(driver_id) = check.driver_id {
            t.require_driver(driver_id)?;
        }
        let Some(stored) = t.checks.iter_mut().find(|c| c.id == check.id) else {
            return Ok(false);
        };
        *stored = check.clone();
        Ok(true)
    }

    async fn delete_condition_check(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.checks.len();
        t.checks.retain(|c| c.id != id);
        Ok(t.checks.len() != before)
    }

    async fn insert_inspection(&self, new: NewInspection) -> AppResult<PostTripInspection> {
        let mut t = self.tables();
        t.require_vehicle(new.fields.vehicle_id)?;
        t.require_driver(new.fields.driver_id)?;

        let inspection = PostTripInspection {
            id: Uuid::new_v4(),
            vehicle_id: new.fields.vehicle_id,
            driver_id: Some(new.fields.driver_id),
            inspector_id: new.inspector_id,
            trip_type: new.fields.trip_type,
            trip_destination: new.fields.trip_destination,
            horse: new.fields.horse,
            trailer: new.fields.trailer,
            documents_complete: new.documents_complete,
            missing_documents: new.missing_documents,
            observations: new.fields.observations,
            status: new.status,
            inspection_date: new.inspection_date,
        };
        t.inspections.push(inspection.clone());
        Ok(inspection)
    }

    async fn get_inspection(&self, id: Uuid) -> AppResult<Option<PostTripInspection>> {
        Ok(self.tables().inspections.iter().find(|i| i.id == id).cloned())
    }

    async fn list_inspections(
        &self,
        filter: InspectionFilter,
    ) -> AppResult<Vec<PostTripInspection>> {
        let mut inspections: Vec<PostTripInspection> = self
            .tables()
            .inspections
            .iter()
            .rev()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        inspections.sort_by(|a, b| b.inspection_date.cmp(&a.inspection_date));
        Ok(inspections)
    }

    async fn save_inspection(&self, inspection: &PostTripInspection) -> AppResult<bool> {
        let mut t = self.tables();
        t.require_vehicle(inspection.vehicle_id)?;
        if let Some(driver_id) = inspection.driver_id {
            t.require_driver(driver_id)?;
        }
        let Some(stored) = t.inspections.iter_mut().find(|i| i.id == inspection.id) else {
            return Ok(false);
        };
        *stored = inspection.clone();
        Ok(true)
    }

    async fn delete_inspection(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.inspections.len();
        t.inspections.retain(|i| i.id != id);
        for entry in t.pending.iter_mut().filter(|p| p.inspection_id == Some(id)) {
            entry.inspection_id = None;
        }
        Ok(t.inspections.len() != before)
    }

    async fn insert_pending(&self, new: NewPendingInspection) -> AppResult<PendingInspection> {
        let mut t = self.tables();
        t.require_vehicle(new.vehicle_id)?;
        if let Some(driver_id) = new.driver_id {
            t.require_driver(driver_id)?;
        }
        let already_pending = t
            .pending
            .iter()
            .any(|p| p.vehicle_id == new.vehicle_id && p.status == PendingStatus::Pending);
        if already_pending {
            return Err(AppError::conflict(
                "vehicle already has a pending inspection",
            ));
        }

        let entry = PendingInspection {
            id: Uuid::new_v4(),
            vehicle_id: new.vehicle_id,
            driver_id: new.driver_id,
            trip_type: new.trip_type,
            trip_destination: new.trip_destination,
            notes: new.notes,
            arrival_date: new.arrival_date,
            status: PendingStatus::Pending,
            inspection_id: None,
            inspected_at: None,
            created_by: new.created_by,
            created_at: new.created_at,
        };
        t.pending.push(entry.clone());
        Ok(entry)
    }

    async fn get_pending(&self, id: Uuid) -> AppResult<Option<PendingInspection>> {
        Ok(self.tables().pending.iter().find(|p| p.id == id).cloned())
    }

    async fn pending_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<PendingInspection>> {
        Ok(self
            .tables()
            .pending
            .iter()
            .find(|p| p.vehicle_id == vehicle_id && p.status == PendingStatus::Pending)
            .cloned())
    }

    async fn list_pending(&self, trip_type: Option<TripType>) -> AppResult<Vec<PendingInspection>> {
        let mut entries: Vec<PendingInspection> = self
            .tables()
            .pending
            .iter()
            .rev()
            .filter(|p| p.status == PendingStatus::Pending)
            .filter(|p| trip_type.map_or(true, |t| p.trip_type == t))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.arrival_date.cmp(&a.arrival_date));
        Ok(entries)
    }

    async fn set_pending_status(
        &self,
        id: Uuid,
        status: PendingStatus,
        inspection_id: Option<Uuid>,
        inspected_at: Option<DateTime<Utc>>,
    ) -> AppResult<Option<PendingInspection>> {
        #[cfg(any(test, feature = "test-util"))]
        self.check_fault(FaultPoint::SetPendingStatus)?;
        let mut t = self.tables();
        let Some(entry) = t.pending.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        entry.status = status;
        entry.inspection_id = inspection_id;
        entry.inspected_at = inspected_at;
        Ok(Some(entry.clone()))
    }

    async fn delete_pending(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables();
        let before = t.pending.len();
        t.pending.retain(|p| p.id != id);
        Ok(t.pending.len() != before)
    }
}
