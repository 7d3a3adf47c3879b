use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{
    DocumentScope, DocumentStore, DriverStore, FlowStore, InspectionFilter, InspectionStore,
    VehicleStore,
};
use crate::checklist::{HorseChecklist, TrailerChecklist};
use crate::error::{AppError, AppResult};
use crate::models::{
    Alert, ConditionComponents, Document, DocumentChanges, DocumentOwner, DocumentType, Driver,
    FileRef, FlowEntry, FlowFilter, FlowRecord, InspectionStatus, NewAlert, NewConditionCheck,
    NewDocument, NewDriver, NewFlowRecord, NewInspection, NewPendingInspection, NewVehicle,
    PendingInspection, PendingStatus, PostTripInspection, TripType, Vehicle,
    VehicleConditionCheck,
};
use crate::status::DocumentStatus;

/// Translate constraint violations into the error taxonomy.
fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() || db.is_check_violation() {
            return AppError::validation(db.message().to_string());
        }
    }
    AppError::Db(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    code: String,
    vehicle_id: Option<Uuid>,
    driver_id: Option<Uuid>,
    name: String,
    doc_type: DocumentType,
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    current_status: DocumentStatus,
    storage_location: Option<String>,
    notes: Option<String>,
    file_path: Option<String>,
    file_name: Option<String>,
    file_mime_type: Option<String>,
    file_size: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = AppError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let owner = DocumentOwner::from_columns(row.vehicle_id, row.driver_id).ok_or_else(|| {
            AppError::Other(anyhow::anyhow!("document {} has no single owner", row.id))
        })?;
        let file = match (row.file_path, row.file_name) {
            (Some(path), Some(file_name)) => Some(FileRef {
                path,
                file_name,
                mime_type: row.file_mime_type,
                size: row.file_size.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Document {
            id: row.id,
            code: row.code,
            owner,
            name: row.name,
            doc_type: row.doc_type,
            issue_date: row.issue_date,
            expiry_date: row.expiry_date,
            current_status: row.current_status,
            storage_location: row.storage_location,
            notes: row.notes,
            file,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn documents_from_rows(rows: Vec<DocumentRow>) -> AppResult<Vec<Document>> {
    rows.into_iter().map(Document::try_from).collect()
}

#[derive(FromRow)]
struct ConditionCheckRow {
    id: Uuid,
    vehicle_id: Uuid,
    driver_id: Option<Uuid>,
    components: Json<ConditionComponents>,
    notes: Option<String>,
    check_date: DateTime<Utc>,
    created_by: Option<Uuid>,
}

impl From<ConditionCheckRow> for VehicleConditionCheck {
    fn from(row: ConditionCheckRow) -> Self {
        VehicleConditionCheck {
            id: row.id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            components: row.components.0,
            notes: row.notes,
            check_date: row.check_date,
            created_by: row.created_by,
        }
    }
}

#[derive(FromRow)]
struct InspectionRow {
    id: Uuid,
    vehicle_id: Uuid,
    driver_id: Option<Uuid>,
    inspector_id: Option<Uuid>,
    trip_type: TripType,
    trip_destination: String,
    horse: Json<HorseChecklist>,
    trailer: Json<TrailerChecklist>,
    documents_complete: bool,
    missing_documents: String,
    observations: Option<String>,
    status: InspectionStatus,
    inspection_date: DateTime<Utc>,
}

impl From<InspectionRow> for PostTripInspection {
    fn from(row: InspectionRow) -> Self {
        PostTripInspection {
            id: row.id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            inspector_id: row.inspector_id,
            trip_type: row.trip_type,
            trip_destination: row.trip_destination,
            horse: row.horse.0,
            trailer: row.trailer.0,
            documents_complete: row.documents_complete,
            missing_documents: row.missing_documents,
            observations: row.observations,
            status: row.status,
            inspection_date: row.inspection_date,
        }
    }
}

const DOCUMENT_COLUMNS: &str = r#"
    id, code, vehicle_id, driver_id, name, doc_type, issue_date, expiry_date,
    current_status, storage_location, notes, file_path, file_name, file_mime_type,
    file_size, created_at, updated_at
"#;

const FLOW_ENTRY_SELECT: &str = r#"
    SELECT
        fr.id,
        fr.document_id,
        fr.driver_id,
        fr.operation_type,
        fr.operation_time,
        fr.expected_return_time,
        fr.actual_return_time,
        fr.notes,
        d.code AS document_code,
        d.name AS document_name,
        d.doc_type AS document_type,
        v.id AS vehicle_id,
        v.license_plate,
        v.model AS vehicle_model,
        v.department,
        v.fleet,
        dr.name AS driver_name,
        dr.staff_no
    FROM flow_records fr
    JOIN documents d ON d.id = fr.document_id
    JOIN vehicles v ON v.id = d.vehicle_id
    JOIN drivers dr ON dr.id = fr.driver_id
"#;

const INSPECTION_SELECT: &str = r#"
    SELECT
        id, vehicle_id, driver_id, inspector_id, trip_type, trip_destination,
        horse, trailer, documents_complete, missing_documents, observations,
        status, inspection_date
    FROM post_trip_inspections
"#;

#[async_trait]
impl VehicleStore for PgStore {
    async fn insert_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, license_plate, model, department, fleet, color, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, license_plate, model, department, fleet, color, status,
                      assigned_driver_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.license_plate)
        .bind(&new.model)
        .bind(&new.department)
        .bind(&new.fleet)
        .bind(&new.color)
        .bind(new.status)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, license_plate, model, department, fleet, color, status,
                   assigned_driver_id, created_at, updated_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, license_plate, model, department, fleet, color, status,
                   assigned_driver_id, created_at, updated_at
            FROM vehicles
            ORDER BY license_plate
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        changes: NewVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET license_plate = $2, model = $3, department = $4, fleet = $5,
                color = $6, status = $7, updated_at = $8
            WHERE id = $1
            RETURNING id, license_plate, model, department, fleet, color, status,
                      assigned_driver_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.license_plate)
        .bind(&changes.model)
        .bind(&changes.department)
        .bind(&changes.fleet)
        .bind(&changes.color)
        .bind(changes.status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_vehicle(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn swap_assigned_driver(
        &self,
        vehicle_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(vehicle_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Db)?;
        if !exists {
            return Err(AppError::not_found(format!("vehicle {vehicle_id}")));
        }

        // the partial unique index rejects a driver already holding another vehicle
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET assigned_driver_id = $3, updated_at = $4
            WHERE id = $1 AND assigned_driver_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(vehicle_id)
        .bind(expected)
        .bind(new)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn vehicle_for_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, license_plate, model, department, fleet, color, status,
                   assigned_driver_id, created_at, updated_at
            FROM vehicles
            WHERE assigned_driver_id = $1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn clear_assignments_for_driver(
        &self,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET assigned_driver_id = NULL, updated_at = $2
            WHERE assigned_driver_id = $1
            "#,
        )
        .bind(driver_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::Db)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DriverStore for PgStore {
    async fn insert_driver(&self, new: NewDriver, now: DateTime<Utc>) -> AppResult<Driver> {
        sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (
                id, staff_no, name, contact, alternative_contact, contact_malawi,
                contact_zambia, contact_zimbabwe, date_of_birth, sex, driver_license_number,
                driver_license_expiry, position, department, fleet, notes, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.staff_no)
        .bind(&new.name)
        .bind(&new.contact)
        .bind(&new.alternative_contact)
        .bind(&new.contact_malawi)
        .bind(&new.contact_zambia)
        .bind(&new.contact_zimbabwe)
        .bind(new.date_of_birth)
        .bind(&new.sex)
        .bind(&new.driver_license_number)
        .bind(new.driver_license_expiry)
        .bind(&new.position)
        .bind(&new.department)
        .bind(&new.fleet)
        .bind(&new.notes)
        .bind(new.status)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Db)
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        sqlx::query_as::<_, Driver>("SELECT * FROM drivers ORDER BY name, staff_no")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Db)
    }

    async fn update_driver(
        &self,
        id: Uuid,
        changes: NewDriver,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>> {
        sqlx::query_as::<_, Driver>(
            r#"
            UPDATE drivers
            SET staff_no = $2, name = $3, contact = $4, alternative_contact = $5,
                contact_malawi = $6, contact_zambia = $7, contact_zimbabwe = $8,
                date_of_birth = $9, sex = $10, driver_license_number = $11,
                driver_license_expiry = $12, position = $13, department = $14,
                fleet = $15, notes = $16, status = $17, updated_at = $18
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.staff_no)
        .bind(&changes.name)
        .bind(&changes.contact)
        .bind(&changes.alternative_contact)
        .bind(&changes.contact_malawi)
        .bind(&changes.contact_zambia)
        .bind(&changes.contact_zimbabwe)
        .bind(changes.date_of_birth)
        .bind(&changes.sex)
        .bind(&changes.driver_license_number)
        .bind(changes.driver_license_expiry)
        .bind(&changes.position)
        .bind(&changes.department)
        .bind(&changes.fleet)
        .bind(&changes.notes)
        .bind(changes.status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn set_profile_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Driver>> {
        sqlx::query_as::<_, Driver>(
            r#"
            UPDATE drivers
            SET profile_photo = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(photo)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<bool> {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE assigned_driver_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Db)?;
        if assigned {
            return Err(AppError::conflict("driver has assigned vehicle"));
        }

        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| match map_db_error(err) {
                // an assignment landed between the check and the delete
                AppError::Validation(_) => AppError::conflict("driver has assigned vehicle"),
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_document(&self, new: NewDocument, now: DateTime<Utc>) -> AppResult<Document> {
        let file = new.file.as_ref();
        let sql = format!(
            r#"
            INSERT INTO documents (
                id, code, vehicle_id, driver_id, name, doc_type, issue_date, expiry_date,
                current_status, storage_location, notes, file_path, file_name,
                file_mime_type, file_size, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.code)
            .bind(new.owner.vehicle_id())
            .bind(new.owner.driver_id())
            .bind(&new.name)
            .bind(new.doc_type)
            .bind(new.issue_date)
            .bind(new.expiry_date)
            .bind(new.current_status)
            .bind(&new.storage_location)
            .bind(&new.notes)
            .bind(file.map(|f| f.path.clone()))
            .bind(file.map(|f| f.file_name.clone()))
            .bind(file.and_then(|f| f.mime_type.clone()))
            .bind(file.map(|f| f.size))
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Document::try_from(row)
    }

    async fn get_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Db)?;
        row.map(Document::try_from).transpose()
    }

    async fn list_documents(&self, scope: DocumentScope) -> AppResult<Vec<Document>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents"
        ));
        match scope {
            DocumentScope::All => {}
            DocumentScope::Owner(DocumentOwner::Vehicle(id)) => {
                builder.push(" WHERE vehicle_id = ").push_bind(id);
            }
            DocumentScope::Owner(DocumentOwner::Driver(id)) => {
                builder.push(" WHERE driver_id = ").push_bind(id);
            }
        }
        builder.push(" ORDER BY expiry_date ASC NULLS LAST, code");

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Db)?;
        documents_from_rows(rows)
    }

    async fn codes_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT code
            FROM documents
            WHERE code LIKE $1
            "#,
        )
        .bind(format!("{prefix}%"))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>> {
        let sql = format!(
            r#"
            UPDATE documents
            SET name = $2, doc_type = $3, issue_date = $4, expiry_date = $5,
                current_status = $6, storage_location = $7, notes = $8, updated_at = $9
            WHERE id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(changes.doc_type)
            .bind(changes.issue_date)
            .bind(changes.expiry_date)
            .bind(changes.current_status)
            .bind(&changes.storage_location)
            .bind(&changes.notes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(Document::try_from).transpose()
    }

    async fn set_document_file(
        &self,
        id: Uuid,
        file: Option<FileRef>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Document>> {
        let sql = format!(
            r#"
            UPDATE documents
            SET file_path = $2, file_name = $3, file_mime_type = $4, file_size = $5, updated_at = $6
            WHERE id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let file = file.as_ref();
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(file.map(|f| f.path.clone()))
            .bind(file.map(|f| f.file_name.clone()))
            .bind(file.and_then(|f| f.mime_type.clone()))
            .bind(file.map(|f| f.size))
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Db)?;
        row.map(Document::try_from).transpose()
    }

    async fn set_stored_status(&self, id: Uuid, status: DocumentStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE documents SET current_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_alert(&self, new: NewAlert, now: DateTime<Utc>) -> AppResult<Alert> {
        sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (id, document_id, alert_type, alert_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, document_id, alert_type, alert_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.document_id)
        .bind(&new.alert_type)
        .bind(new.alert_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_alerts(&self, document_id: Uuid) -> AppResult<Vec<Alert>> {
        sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, document_id, alert_type, alert_date, created_at
            FROM alerts
            WHERE document_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Db)
    }
}

#[async_trait]
impl FlowStore for PgStore {
    async fn insert_flow(&self, new: NewFlowRecord) -> AppResult<FlowRecord> {
        sqlx::query_as::<_, FlowRecord>(
            r#"
            INSERT INTO flow_records (
                id, document_id, driver_id, operation_type, operation_time,
                expected_return_time, actual_return_time, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, document_id, driver_id, operation_type, operation_time,
                      expected_return_time, actual_return_time, notes
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.document_id)
        .bind(new.driver_id)
        .bind(new.operation_type)
        .bind(new.operation_time)
        .bind(new.expected_return_time)
        .bind(new.actual_return_time)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_flow(&self, id: Uuid) -> AppResult<Option<FlowRecord>> {
        sqlx::query_as::<_, FlowRecord>(
            r#"
            SELECT id, document_id, driver_id, operation_type, operation_time,
                   expected_return_time, actual_return_time, notes
            FROM flow_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn save_flow(&self, record: &FlowRecord) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE flow_records
            SET driver_id = $2, expected_return_time = $3, actual_return_time = $4, notes = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.driver_id)
        .bind(record.expected_return_time)
        .bind(record.actual_return_time)
        .bind(&record.notes)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_flow(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM flow_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_flows_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM flow_records
            WHERE document_id IN (SELECT id FROM documents WHERE vehicle_id = $1)
            "#,
        )
        .bind(vehicle_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Db)?;
        Ok(result.rows_affected())
    }

    async fn list_flow_entries(&self, filter: FlowFilter) -> AppResult<Vec<FlowEntry>> {
        let mut builder = QueryBuilder::<Postgres>::new(FLOW_ENTRY_SELECT);
        match filter {
            FlowFilter::All => {}
            FlowFilter::Vehicle(id) => {
                builder.push(" WHERE v.id = ").push_bind(id);
            }
            FlowFilter::Document(id) => {
                builder.push(" WHERE fr.document_id = ").push_bind(id);
            }
            FlowFilter::Driver(id) => {
                builder.push(" WHERE fr.driver_id = ").push_bind(id);
            }
            FlowFilter::Between(start, end) => {
                builder
                    .push(" WHERE fr.operation_time BETWEEN ")
                    .push_bind(start)
                    .push(" AND ")
                    .push_bind(end);
            }
        }
        builder.push(" ORDER BY fr.operation_time DESC");

        builder
            .build_query_as::<FlowEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Db)
    }
}

#[async_trait]
impl InspectionStore for PgStore {
    async fn insert_condition_check(
        &self,
        new: NewConditionCheck,
    ) -> AppResult<VehicleConditionCheck> {
        let row = sqlx::query_as::<_, ConditionCheckRow>(
            r#"
            INSERT INTO vehicle_condition_checks (id, vehicle_id, driver_id, components, notes, check_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, vehicle_id, driver_id, components, notes, check_date, created_by
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.vehicle_id)
        .bind(new.driver_id)
        .bind(Json(&new.components))
        .bind(&new.notes)
        .bind(new.check_date)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn get_condition_check(&self, id: Uuid) -> AppResult<Option<VehicleConditionCheck>> {
        let row = sqlx::query_as::<_, ConditionCheckRow>(
            r#"
            SELECT id, vehicle_id, driver_id, components, notes, check_date, created_by
            FROM vehicle_condition_checks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)?;
        Ok(row.map(Into::into))
    }

    async fn list_condition_checks(
        &self,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<VehicleConditionCheck>> {
        let rows = sqlx::query_as::<_, ConditionCheckRow>(
            r#"
            SELECT id, vehicle_id, driver_id, components, notes, check_date, created_by
            FROM vehicle_condition_checks
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
            ORDER BY check_date DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Db)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_condition_check(&self, check: &VehicleConditionCheck) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE vehicle_condition_checks
            SET vehicle_id = $2, driver_id = $3, components = $4, notes = $5, check_date = $6
            WHERE id = $1
            "#,
        )
        .bind(check.id)
        .bind(check.vehicle_id)
        .bind(check.driver_id)
        .bind(Json(&check.components))
        .bind(&check.notes)
        .bind(check.check_date)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_condition_check(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM vehicle_condition_checks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_inspection(&self, new: NewInspection) -> AppResult<PostTripInspection> {
        let row = sqlx::query_as::<_, InspectionRow>(
            r#"
            INSERT INTO post_trip_inspections (
                id, vehicle_id, driver_id, inspector_id, trip_type, trip_destination,
                horse, trailer, documents_complete, missing_documents, observations,
                status, inspection_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, vehicle_id, driver_id, inspector_id, trip_type, trip_destination,
                      horse, trailer, documents_complete, missing_documents, observations,
                      status, inspection_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.fields.vehicle_id)
        .bind(new.fields.driver_id)
        .bind(new.inspector_id)
        .bind(new.fields.trip_type)
        .bind(&new.fields.trip_destination)
        .bind(Json(&new.fields.horse))
        .bind(Json(&new.fields.trailer))
        .bind(new.documents_complete)
        .bind(&new.missing_documents)
        .bind(&new.fields.observations)
        .bind(new.status)
        .bind(new.inspection_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn get_inspection(&self, id: Uuid) -> AppResult<Option<PostTripInspection>> {
        let row = sqlx::query_as::<_, InspectionRow>(&format!("{INSPECTION_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(row.map(Into::into))
    }

    async fn list_inspections(
        &self,
        filter: InspectionFilter,
    ) -> AppResult<Vec<PostTripInspection>> {
        let mut builder = QueryBuilder::<Postgres>::new(INSPECTION_SELECT);
        match filter {
            InspectionFilter::All => {}
            InspectionFilter::Vehicle(id) => {
                builder.push(" WHERE vehicle_id = ").push_bind(id);
            }
            InspectionFilter::TripType(trip_type) => {
                builder.push(" WHERE trip_type = ").push_bind(trip_type);
            }
            InspectionFilter::Between(start, end) => {
                builder
                    .push(" WHERE inspection_date BETWEEN ")
                    .push_bind(start)
                    .push(" AND ")
                    .push_bind(end);
            }
        }
        builder.push(" ORDER BY inspection_date DESC");

        let rows = builder
            .build_query_as::<InspectionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_inspection(&self, inspection: &PostTripInspection) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE post_trip_inspections
            SET vehicle_id = $2, driver_id = $3, inspector_id = $4, trip_type = $5,
                trip_destination = $6, horse = $7, trailer = $8, documents_complete = $9,
                missing_documents = $10, observations = $11, status = $12, inspection_date = $13
            WHERE id = $1
            "#,
        )
        .bind(inspection.id)
        .bind(inspection.vehicle_id)
        .bind(inspection.driver_id)
        .bind(inspection.inspector_id)
        .bind(inspection.trip_type)
        .bind(&inspection.trip_destination)
        .bind(Json(&inspection.horse))
        .bind(Json(&inspection.trailer))
        .bind(inspection.documents_complete)
        .bind(&inspection.missing_documents)
        .bind(&inspection.observations)
        .bind(inspection.status)
        .bind(inspection.inspection_date)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_inspection(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM post_trip_inspections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_pending(&self, new: NewPendingInspection) -> AppResult<PendingInspection> {
        if self.pending_for_vehicle(new.vehicle_id).await?.is_some() {
            return Err(AppError::conflict("vehicle already has a pending inspection"));
        }

        sqlx::query_as::<_, PendingInspection>(
            r#"
            INSERT INTO pending_vehicle_inspections (
                id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                arrival_date, status, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
            RETURNING id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                      arrival_date, status, inspection_id, inspected_at, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.vehicle_id)
        .bind(new.driver_id)
        .bind(new.trip_type)
        .bind(&new.trip_destination)
        .bind(&new.notes)
        .bind(new.arrival_date)
        .bind(new.created_by)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn get_pending(&self, id: Uuid) -> AppResult<Option<PendingInspection>> {
        sqlx::query_as::<_, PendingInspection>(
            r#"
            SELECT id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                   arrival_date, status, inspection_id, inspected_at, created_by, created_at
            FROM pending_vehicle_inspections
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn pending_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<PendingInspection>> {
        sqlx::query_as::<_, PendingInspection>(
            r#"
            SELECT id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                   arrival_date, status, inspection_id, inspected_at, created_by, created_at
            FROM pending_vehicle_inspections
            WHERE vehicle_id = $1 AND status = 'pending'
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn list_pending(&self, trip_type: Option<TripType>) -> AppResult<Vec<PendingInspection>> {
        sqlx::query_as::<_, PendingInspection>(
            r#"
            SELECT id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                   arrival_date, status, inspection_id, inspected_at, created_by, created_at
            FROM pending_vehicle_inspections
            WHERE status = 'pending' AND ($1::trip_type IS NULL OR trip_type = $1)
            ORDER BY arrival_date DESC
            "#,
        )
        .bind(trip_type)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Db)
    }

    async fn set_pending_status(
        &self,
        id: Uuid,
        status: PendingStatus,
        inspection_id: Option<Uuid>,
        inspected_at: Option<DateTime<Utc>>,
    ) -> AppResult<Option<PendingInspection>> {
        sqlx::query_as::<_, PendingInspection>(
            r#"
            UPDATE pending_vehicle_inspections
            SET status = $2, inspection_id = $3, inspected_at = $4
            WHERE id = $1
            RETURNING id, vehicle_id, driver_id, trip_type, trip_destination, notes,
                      arrival_date, status, inspection_id, inspected_at, created_by, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(inspection_id)
        .bind(inspected_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_pending(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM pending_vehicle_inspections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Db)?;
        Ok(result.rows_affected() > 0)
    }
}
