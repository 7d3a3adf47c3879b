//! Vehicle and driver registries.

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{optional_text, required_text, Deps, OrNotFound};
use crate::blob::{BlobArea, Upload};
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentOwner, Driver, FileRef, NewDriver, NewVehicle, Vehicle};
use crate::outcome::{SideEffect, WithSideEffects};
use crate::status::{classify, DocumentStatus};
use crate::store::DocumentScope;

/// A vehicle with its document health and current driver.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VehicleOverview {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub total_documents: usize,
    pub expired_documents: usize,
    pub expiring_documents: usize,
    pub driver_name: Option<String>,
    pub driver_staff_no: Option<String>,
}

/// Guess a content type for a stored photo from its extension.
pub fn photo_mime_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct FleetRegistry {
    deps: Deps,
}

impl FleetRegistry {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    pub async fn create_vehicle(&self, new: NewVehicle) -> AppResult<Vehicle> {
        let new = validate_vehicle(new)?;
        let vehicle = self
            .deps
            .store
            .insert_vehicle(new, self.deps.clock.now())
            .await?;
        info!(vehicle_id = %vehicle.id, license_plate = %vehicle.license_plate, "Vehicle created");
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: Uuid) -> AppResult<Vehicle> {
        self.deps
            .store
            .get_vehicle(id)
            .await?
            .or_not_found(format!("vehicle {id}"))
    }

    pub async fn list_vehicles(&self) -> AppResult<Vec<VehicleOverview>> {
        let today = self.deps.clock.today();
        let vehicles = self.deps.store.list_vehicles().await?;
        let drivers = self.deps.store.list_drivers().await?;
        let documents = self.deps.store.list_documents(DocumentScope::All).await?;

        Ok(vehicles
            .into_iter()
            .map(|vehicle| {
                let owned: Vec<&Document> = documents
                    .iter()
                    .filter(|d| d.owner == DocumentOwner::Vehicle(vehicle.id))
                    .collect();
                let count = |wanted: DocumentStatus| {
                    owned
                        .iter()
                        .filter(|d| classify(d.expiry_date, today) == wanted)
                        .count()
                };
                let driver = vehicle
                    .assigned_driver_id
                    .and_then(|id| drivers.iter().find(|d| d.id == id));

                VehicleOverview {
                    total_documents: owned.len(),
                    expired_documents: count(DocumentStatus::Expired),
                    expiring_documents: count(DocumentStatus::Expiring30Days),
                    driver_name: driver.map(|d| d.name.clone()),
                    driver_staff_no: driver.map(|d| d.staff_no.clone()),
                    vehicle,
                }
            })
            .collect())
    }

    pub async fn update_vehicle(&self, id: Uuid, changes: NewVehicle) -> AppResult<Vehicle> {
        let changes = validate_vehicle(changes)?;
        let vehicle = self
            .deps
            .store
            .update_vehicle(id, changes, self.deps.clock.now())
            .await?
            .or_not_found(format!("vehicle {id}"))?;
        info!(vehicle_id = %id, "Vehicle updated");
        Ok(vehicle)
    }

    /// Deletes the vehicle with its documents, then releases their files.
    pub async fn delete_vehicle(&self, id: Uuid) -> AppResult<WithSideEffects<()>> {
        let paths = self.owned_file_paths(DocumentOwner::Vehicle(id)).await?;
        if !self.deps.store.delete_vehicle(id).await? {
            return Err(AppError::not_found(format!("vehicle {id}")));
        }
        info!(vehicle_id = %id, released_files = paths.len(), "Vehicle deleted");

        let mut outcome = WithSideEffects::new(());
        self.release_all(&mut outcome, paths).await;
        Ok(outcome)
    }

    pub async fn create_driver(&self, new: NewDriver) -> AppResult<Driver> {
        let new = validate_driver(new)?;
        let driver = self
            .deps
            .store
            .insert_driver(new, self.deps.clock.now())
            .await?;
        info!(driver_id = %driver.id, staff_no = %driver.staff_no, "Driver created");
        Ok(driver)
    }

    pub async fn get_driver(&self, id: Uuid) -> AppResult<Driver> {
        self.deps
            .store
            .get_driver(id)
            .await?
            .or_not_found(format!("driver {id}"))
    }

    pub async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        self.deps.store.list_drivers().await
    }

    pub async fn update_driver(&self, id: Uuid, changes: NewDriver) -> AppResult<Driver> {
        let changes = validate_driver(changes)?;
        let driver = self
            .deps
            .store
            .update_driver(id, changes, self.deps.clock.now())
            .await?
            .or_not_found(format!("driver {id}"))?;
        info!(driver_id = %id, "Driver updated");
        Ok(driver)
    }

    /// Refused while the driver still holds a vehicle.
    pub async fn delete_driver(&self, id: Uuid) -> AppResult<WithSideEffects<()>> {
        let driver = self.get_driver(id).await?;
        if let Some(vehicle) = self.deps.store.vehicle_for_driver(id).await? {
            return Err(AppError::conflict(format!(
                "driver has assigned vehicle {}",
                vehicle.license_plate
            )));
        }

        let mut paths = self.owned_file_paths(DocumentOwner::Driver(id)).await?;
        paths.extend(driver.profile_photo);

        if !self.deps.store.delete_driver(id).await? {
            return Err(AppError::not_found(format!("driver {id}")));
        }
        info!(driver_id = %id, released_files = paths.len(), "Driver deleted");

        let mut outcome = WithSideEffects::new(());
        self.release_all(&mut outcome, paths).await;
        Ok(outcome)
    }

    /// Store a new profile photo; the previous one is released best-effort.
    pub async fn set_photo(&self, id: Uuid, upload: Upload) -> AppResult<WithSideEffects<Driver>> {
        let driver = self.get_driver(id).await?;
        let file = self.deps.blobs.store(BlobArea::Profiles, id, upload).await?;

        let updated = match self
            .deps
            .store
            .set_profile_photo(id, Some(file.path.clone()), self.deps.clock.now())
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.release_unreferenced(&file.path).await;
                return Err(AppError::not_found(format!("driver {id}")));
            }
            Err(err) => {
                self.release_unreferenced(&file.path).await;
                return Err(err);
            }
        };
        info!(driver_id = %id, photo = %file.path, "Driver photo stored");

        let mut outcome = WithSideEffects::new(updated);
        self.release_all(&mut outcome, driver.profile_photo.into_iter().collect())
            .await;
        Ok(outcome)
    }

    pub async fn remove_photo(&self, id: Uuid) -> AppResult<WithSideEffects<Driver>> {
        let driver = self.get_driver(id).await?;
        let updated = self
            .deps
            .store
            .set_profile_photo(id, None, self.deps.clock.now())
            .await?
            .or_not_found(format!("driver {id}"))?;

        let mut outcome = WithSideEffects::new(updated);
        self.release_all(&mut outcome, driver.profile_photo.into_iter().collect())
            .await;
        Ok(outcome)
    }

    pub async fn photo(&self, id: Uuid) -> AppResult<(FileRef, Vec<u8>)> {
        let driver = self.get_driver(id).await?;
        let path = driver
            .profile_photo
            .or_not_found(format!("photo for driver {id}"))?;
        let file_name = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();
        let file = FileRef {
            mime_type: Some(photo_mime_type(&path).to_string()),
            file_name,
            path,
            size: 0,
        };
        let bytes = self.deps.blobs.read(&file).await?;
        Ok((
            FileRef {
                size: bytes.len() as i64,
                ..file
            },
            bytes,
        ))
    }

    async fn owned_file_paths(&self, owner: DocumentOwner) -> AppResult<Vec<String>> {
        Ok(self
            .deps
            .store
            .list_documents(DocumentScope::Owner(owner))
            .await?
            .into_iter()
            .filter_map(|d| d.file.map(|f| f.path))
            .collect())
    }

    async fn release_unreferenced(&self, path: &str) {
        if let Err(err) = self.deps.blobs.delete(path).await {
            warn!(file_path = %path, error = %err, "Failed to release unreferenced blob");
        }
    }

    /// Release blobs nothing references any more; the first failure is reported.
    async fn release_all<T>(&self, outcome: &mut WithSideEffects<T>, paths: Vec<String>) {
        if paths.is_empty() {
            outcome.skip(SideEffect::BlobCleanup);
            return;
        }
        let mut result = Ok(());
        for path in paths {
            if let Err(err) = self.deps.blobs.delete(&path).await {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        outcome.record(SideEffect::BlobCleanup, result);
    }
}

fn validate_vehicle(new: NewVehicle) -> AppResult<NewVehicle> {
    Ok(NewVehicle {
        license_plate: required_text(Some(&new.license_plate), "license_plate")?,
        model: required_text(Some(&new.model), "model")?,
        department: required_text(Some(&new.department), "department")?,
        fleet: optional_text(new.fleet),
        color: optional_text(new.color),
        status: new.status,
    })
}

fn validate_driver(new: NewDriver) -> AppResult<NewDriver> {
    Ok(NewDriver {
        staff_no: required_text(Some(&new.staff_no), "staff_no")?,
        name: required_text(Some(&new.name), "name")?,
        contact: required_text(Some(&new.contact), "contact")?,
        alternative_contact: optional_text(new.alternative_contact),
        contact_malawi: optional_text(new.contact_malawi),
        contact_zambia: optional_text(new.contact_zambia),
        contact_zimbabwe: optional_text(new.contact_zimbabwe),
        sex: optional_text(new.sex),
        driver_license_number: optional_text(new.driver_license_number),
        position: optional_text(new.position),
        department: optional_text(new.department),
        fleet: optional_text(new.fleet),
        notes: optional_text(new.notes),
        ..new
    })
}
