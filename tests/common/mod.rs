#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use fleet_dms::blob::{Blobs, Upload};
use fleet_dms::clock::{Clock, ManualClock};
use fleet_dms::models::{Document, DocumentOwner, DocumentType, Driver, NewDriver, NewVehicle, Vehicle};
use fleet_dms::services::documents::DocumentInput;
use fleet_dms::state::AppState;
use fleet_dms::store::{FleetStore, MemoryStore};

/// Services over an in-memory store, memory blobs and a pinned clock.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::on(today())
    }

    pub fn on(date: NaiveDate) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at_date(date));
        let blobs = Blobs::memory().expect("memory operator");
        let state = AppState::with_clock(
            store.clone() as Arc<dyn FleetStore>,
            blobs,
            clock.clone() as Arc<dyn Clock>,
        );
        Self { state, store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn days_from_today(&self, days: i64) -> NaiveDate {
        self.today() + Duration::days(days)
    }

    pub async fn vehicle(&self, plate: &str) -> Vehicle {
        self.state
            .fleet()
            .create_vehicle(NewVehicle {
                license_plate: plate.to_string(),
                model: "Scania R450".to_string(),
                department: "Logistics".to_string(),
                fleet: Some("North".to_string()),
                color: None,
                status: Default::default(),
            })
            .await
            .expect("vehicle created")
    }

    pub async fn driver(&self, staff_no: &str, name: &str) -> Driver {
        self.state
            .fleet()
            .create_driver(NewDriver {
                staff_no: staff_no.to_string(),
                name: name.to_string(),
                contact: "+258 84 000 0000".to_string(),
                ..Default::default()
            })
            .await
            .expect("driver created")
    }

    pub async fn vehicle_document(&self, vehicle_id: Uuid, expiry: Option<NaiveDate>) -> Document {
        self.state
            .documents()
            .create(
                DocumentOwner::Vehicle(vehicle_id),
                document_input(DocumentType::Insurance, expiry),
                None,
            )
            .await
            .expect("document created")
            .value
    }

    pub async fn driver_document(&self, driver_id: Uuid, code: &str, expiry: Option<NaiveDate>) -> Document {
        let input = DocumentInput {
            code: Some(code.to_string()),
            ..document_input(DocumentType::CartaConducao, expiry)
        };
        self.state
            .documents()
            .create(DocumentOwner::Driver(driver_id), input, None)
            .await
            .expect("driver document created")
            .value
    }

    /// Every blob key currently under `prefix`.
    pub async fn blob_keys(&self, prefix: &str) -> Vec<String> {
        self.state
            .blobs
            .operator()
            .list_with(prefix)
            .recursive(true)
            .await
            .expect("blob listing")
            .into_iter()
            .map(|entry| entry.path().to_string())
            .filter(|path| !path.ends_with('/'))
            .collect()
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub fn document_input(doc_type: DocumentType, expiry: Option<NaiveDate>) -> DocumentInput {
    DocumentInput {
        code: None,
        name: "Third-party insurance".to_string(),
        doc_type,
        issue_date: None,
        expiry_date: expiry,
        storage_location: Some("Cabinet A".to_string()),
        notes: None,
    }
}

pub fn upload(name: &str, bytes: &[u8]) -> Upload {
    Upload {
        file_name: name.to_string(),
        mime_type: Some("application/pdf".to_string()),
        bytes: bytes.to_vec(),
    }
}
