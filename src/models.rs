use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::checklist::{HorseChecklist, TrailerChecklist};
use crate::status::DocumentStatus;

/// Vehicle lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Inactive,
}

impl Default for VehicleStatus {
    fn default() -> Self {
        VehicleStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "driver_status", rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    OnLeave,
    Inactive,
}

impl Default for DriverStatus {
    fn default() -> Self {
        DriverStatus::Active
    }
}

/// Vehicle model - maps to the `vehicles` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vehicle {
    pub id: Uuid,

    /// Unique plate, e.g. "ABC-123"
    pub license_plate: String,

    pub model: String,
    pub department: String,
    pub fleet: Option<String>,
    pub color: Option<String>,
    pub status: VehicleStatus,

    /// Driver currently responsible for the vehicle, at most one
    pub assigned_driver_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewVehicle {
    pub license_plate: String,
    pub model: String,
    pub department: String,
    #[serde(default)]
    pub fleet: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub status: VehicleStatus,
}

/// Driver model - maps to the `drivers` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Driver {
    pub id: Uuid,

    /// Unique staff number
    pub staff_no: String,

    pub name: String,
    pub contact: String,
    pub alternative_contact: Option<String>,
    pub contact_malawi: Option<String>,
    pub contact_zambia: Option<String>,
    pub contact_zimbabwe: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub driver_license_number: Option<String>,
    pub driver_license_expiry: Option<NaiveDate>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub fleet: Option<String>,
    pub notes: Option<String>,
    pub status: DriverStatus,

    /// Blob key of the profile photo
    pub profile_photo: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewDriver {
    pub staff_no: String,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub alternative_contact: Option<String>,
    #[serde(default)]
    pub contact_malawi: Option<String>,
    #[serde(default)]
    pub contact_zambia: Option<String>,
    #[serde(default)]
    pub contact_zimbabwe: Option<String>,
    #[serde(default, deserialize_with = "crate::status::deserialize_optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub driver_license_number: Option<String>,
    #[serde(default, deserialize_with = "crate::status::deserialize_optional_date")]
    pub driver_license_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub fleet: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: DriverStatus,
}

/// Which side of the fleet a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Vehicle,
    Driver,
}

/// Exclusive owner of a document: one vehicle or one driver, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DocumentOwner {
    Vehicle(Uuid),
    Driver(Uuid),
}

impl DocumentOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            DocumentOwner::Vehicle(_) => OwnerKind::Vehicle,
            DocumentOwner::Driver(_) => OwnerKind::Driver,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            DocumentOwner::Vehicle(id) | DocumentOwner::Driver(id) => *id,
        }
    }

    pub fn vehicle_id(&self) -> Option<Uuid> {
        match self {
            DocumentOwner::Vehicle(id) => Some(*id),
            DocumentOwner::Driver(_) => None,
        }
    }

    pub fn driver_id(&self) -> Option<Uuid> {
        match self {
            DocumentOwner::Driver(id) => Some(*id),
            DocumentOwner::Vehicle(_) => None,
        }
    }

    /// Rebuild an owner from the two nullable reference columns.
    pub fn from_columns(vehicle_id: Option<Uuid>, driver_id: Option<Uuid>) -> Option<Self> {
        match (vehicle_id, driver_id) {
            (Some(vehicle), None) => Some(DocumentOwner::Vehicle(vehicle)),
            (None, Some(driver)) => Some(DocumentOwner::Driver(driver)),
            _ => None,
        }
    }
}

/// Fixed catalog of tracked document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
pub enum DocumentType {
    // vehicle papers
    LivreteCabeca,
    LivreteTrela,
    Caderneta,
    Registration,
    OperationLicense,
    Insurance,
    SeguroTrela,
    Inspection,
    InspecaoTrela,
    LivreTransitoCfm,
    MozambiquePermit,
    RadioDifusao,
    ManifestoMunicipal,
    Comesa,
    TransportCert,
    // driver papers
    CartaConducao,
    Cnh,
    ExameMedico,
    CertTreinamento,
    CertDefesaDefensiva,
    CertCargasPerigosas,
    SeguroPessoal,
    Other,
}

impl DocumentType {
    pub fn applies_to(&self, owner: OwnerKind) -> bool {
        use DocumentType::*;
        match self {
            Other => true,
            CartaConducao | Cnh | ExameMedico | CertTreinamento | CertDefesaDefensiva
            | CertCargasPerigosas | SeguroPessoal => owner == OwnerKind::Driver,
            _ => owner == OwnerKind::Vehicle,
        }
    }
}

/// Pointer to the single blob a document (or photo) currently owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRef {
    /// Blob store key
    pub path: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size: i64,
}

/// A tracked regulatory document owned by a vehicle or a driver.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: Uuid,

    /// `DOC<year><seq>` for vehicle documents, caller-chosen for driver documents
    pub code: String,

    /// `{"kind": "vehicle" | "driver", "id": <uuid>}`
    #[schema(value_type = Object)]
    pub owner: DocumentOwner,
    pub name: String,
    pub doc_type: DocumentType,
    pub issue_date: Option<NaiveDate>,

    /// Absent means the document never expires
    pub expiry_date: Option<NaiveDate>,

    /// Status as of the last time it was computed; see [`Document::with_live_status`]
    pub current_status: DocumentStatus,

    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub file: Option<FileRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Replace the cached status with the classification for `today`.
    pub fn with_live_status(mut self, today: NaiveDate) -> Self {
        self.current_status = crate::status::classify(self.expiry_date, today);
        self
    }
}

/// Everything needed to insert a document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub code: String,
    pub owner: DocumentOwner,
    pub name: String,
    pub doc_type: DocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub current_status: DocumentStatus,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub file: Option<FileRef>,
}

/// Editable document fields; a full replacement of the metadata.
#[derive(Debug, Clone)]
pub struct DocumentChanges {
    pub name: String,
    pub doc_type: DocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub current_status: DocumentStatus,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
}

/// Reminder emitted when a document enters its final 30 days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Alert {
    pub id: Uuid,
    pub document_id: Uuid,
    pub alert_type: String,
    pub alert_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

pub const ALERT_THIRTY_DAYS: &str = "30_days";

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub document_id: Uuid,
    pub alert_type: String,
    pub alert_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "flow_operation", rename_all = "snake_case")]
pub enum OperationType {
    Withdrawal,
    Return,
}

/// One custody hand-off of a document, as logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FlowRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub driver_id: Uuid,
    pub operation_type: OperationType,
    pub operation_time: DateTime<Utc>,
    pub expected_return_time: Option<DateTime<Utc>>,
    pub actual_return_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFlowRecord {
    pub document_id: Uuid,
    pub driver_id: Uuid,
    pub operation_type: OperationType,
    pub operation_time: DateTime<Utc>,
    pub expected_return_time: Option<DateTime<Utc>>,
    pub actual_return_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Editable flow record fields. The operation tag is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct FlowRecordChanges {
    /// Keeps the current driver when absent
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub expected_return_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_return_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A flow record joined with its document, vehicle and driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FlowEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: FlowRecord,
    pub document_code: String,
    pub document_name: String,
    pub document_type: DocumentType,
    pub vehicle_id: Uuid,
    pub license_plate: String,
    pub vehicle_model: String,
    pub department: String,
    pub fleet: Option<String>,
    pub driver_name: String,
    pub staff_no: String,
}

/// Filter shapes supported by the flow ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowFilter {
    All,
    Vehicle(Uuid),
    Document(Uuid),
    Driver(Uuid),
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl FlowFilter {
    pub fn matches(&self, entry: &FlowEntry) -> bool {
        match *self {
            FlowFilter::All => true,
            FlowFilter::Vehicle(id) => entry.vehicle_id == id,
            FlowFilter::Document(id) => entry.record.document_id == id,
            FlowFilter::Driver(id) => entry.record.driver_id == id,
            FlowFilter::Between(start, end) => {
                entry.record.operation_time >= start && entry.record.operation_time <= end
            }
        }
    }
}

/// Rating of one inspected vehicle component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComponentCondition {
    #[serde(rename = "bom")]
    Good,
    #[serde(rename = "mau")]
    Bad,
}

impl Default for ComponentCondition {
    fn default() -> Self {
        ComponentCondition::Good
    }
}

/// The eleven components looked at during a condition check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ConditionComponents {
    pub windshield: ComponentCondition,
    pub left_mirror: ComponentCondition,
    pub right_mirror: ComponentCondition,
    pub bumper: ComponentCondition,
    pub bonnet: ComponentCondition,
    pub headlights: ComponentCondition,
    pub trailer_lights: ComponentCondition,
    pub paintwork: ComponentCondition,
    pub tyres: ComponentCondition,
    pub mudguards: ComponentCondition,
    pub spare_wheel: ComponentCondition,
}

impl ConditionComponents {
    pub fn entries(&self) -> [(&'static str, ComponentCondition); 11] {
        [
            ("windshield", self.windshield),
            ("left_mirror", self.left_mirror),
            ("right_mirror", self.right_mirror),
            ("bumper", self.bumper),
            ("bonnet", self.bonnet),
            ("headlights", self.headlights),
            ("trailer_lights", self.trailer_lights),
            ("paintwork", self.paintwork),
            ("tyres", self.tyres),
            ("mudguards", self.mudguards),
            ("spare_wheel", self.spare_wheel),
        ]
    }

    /// Components rated bad, in checklist order.
    pub fn defects(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, condition)| *condition == ComponentCondition::Bad)
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VehicleConditionCheck {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub components: ConditionComponents,
    pub notes: Option<String>,
    pub check_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewConditionCheck {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub components: ConditionComponents,
    pub notes: Option<String>,
    pub check_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "trip_type", rename_all = "snake_case")]
pub enum TripType {
    Internal,
    LongTrip,
}

impl TripType {
    /// How often a vehicle on this kind of trip must be inspected.
    pub fn inspection_period_days(&self) -> i64 {
        match self {
            TripType::Internal => 7,
            TripType::LongTrip => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inspection_status", rename_all = "snake_case")]
pub enum InspectionStatus {
    Verified,
    Incomplete,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostTripInspection {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub inspector_id: Option<Uuid>,
    pub trip_type: TripType,
    pub trip_destination: String,
    pub horse: HorseChecklist,
    pub trailer: TrailerChecklist,
    pub documents_complete: bool,
    pub missing_documents: String,
    pub observations: Option<String>,
    pub status: InspectionStatus,
    pub inspection_date: DateTime<Utc>,
}

/// Post-trip inspection fields as written; completeness is derived on save.
#[derive(Debug, Clone)]
pub struct InspectionFields {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub trip_type: TripType,
    pub trip_destination: String,
    pub horse: HorseChecklist,
    pub trailer: TrailerChecklist,
    pub observations: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInspection {
    pub fields: InspectionFields,
    pub inspector_id: Option<Uuid>,
    pub documents_complete: bool,
    pub missing_documents: String,
    pub status: InspectionStatus,
    pub inspection_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "pending_status", rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Inspected,
    Cancelled,
}

/// A vehicle queued for a post-trip inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PendingInspection {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub trip_type: TripType,
    pub trip_destination: String,
    pub notes: Option<String>,
    pub arrival_date: DateTime<Utc>,
    pub status: PendingStatus,
    pub inspection_id: Option<Uuid>,
    pub inspected_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPendingInspection {
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub trip_type: TripType,
    pub trip_destination: String,
    pub notes: Option<String>,
    pub arrival_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_round_trips_through_columns() {
        let id = Uuid::new_v4();
        let owner = DocumentOwner::from_columns(Some(id), None).expect("vehicle owner");
        assert_eq!(owner, DocumentOwner::Vehicle(id));
        assert_eq!(owner.vehicle_id(), Some(id));
        assert_eq!(owner.driver_id(), None);

        assert!(DocumentOwner::from_columns(Some(id), Some(id)).is_none());
        assert!(DocumentOwner::from_columns(None, None).is_none());
    }

    #[test]
    fn owner_serializes_as_tagged_reference() {
        let id = Uuid::nil();
        let json = serde_json::to_value(DocumentOwner::Driver(id)).expect("serializes");
        assert_eq!(json["kind"], "driver");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn document_types_are_scoped_to_their_owner() {
        assert!(DocumentType::Insurance.applies_to(OwnerKind::Vehicle));
        assert!(!DocumentType::Insurance.applies_to(OwnerKind::Driver));
        assert!(DocumentType::CartaConducao.applies_to(OwnerKind::Driver));
        assert!(!DocumentType::CartaConducao.applies_to(OwnerKind::Vehicle));
        assert!(DocumentType::Other.applies_to(OwnerKind::Vehicle));
        assert!(DocumentType::Other.applies_to(OwnerKind::Driver));
    }

    #[test]
    fn condition_components_default_to_good_and_report_defects() {
        let mut components: ConditionComponents =
            serde_json::from_str(r#"{"tyres": "mau"}"#).expect("partial payload parses");
        assert_eq!(components.windshield, ComponentCondition::Good);
        assert_eq!(components.defects(), vec!["tyres"]);

        components.windshield = ComponentCondition::Bad;
        assert_eq!(components.defects(), vec!["windshield", "tyres"]);
    }
}
