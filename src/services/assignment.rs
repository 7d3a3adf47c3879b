//! One driver per vehicle, one vehicle per driver.

use tracing::{info, warn};
use uuid::Uuid;

use super::{Deps, OrNotFound};
use crate::error::{AppError, AppResult};
use crate::models::Vehicle;

const SWAP_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct AssignmentRegistry {
    deps: Deps,
}

impl AssignmentRegistry {
    pub fn new(deps: Deps) -> Self {
        Self { deps }
    }

    async fn vehicle(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
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

    /// Assigning the driver a vehicle already has is accepted as is.
    pub async fn assign(&self, vehicle_id: Uuid, driver_id: Uuid) -> AppResult<Vehicle> {
        let vehicle = self.vehicle(vehicle_id).await?;
        self.require_driver(driver_id).await?;

        match vehicle.assigned_driver_id {
            Some(current) if current == driver_id => return Ok(vehicle),
            Some(current) => {
                return Err(AppError::conflict(format!(
                    "vehicle {} is already assigned to driver {current}",
                    vehicle.license_plate
                )))
            }
            None => {}
        }

        let swapped = self
            .deps
            .store
            .swap_assigned_driver(vehicle_id, None, Some(driver_id), self.deps.clock.now())
            .await?;

        let vehicle = self.vehicle(vehicle_id).await?;
        if !swapped && vehicle.assigned_driver_id != Some(driver_id) {
            warn!(vehicle_id = %vehicle_id, driver_id = %driver_id, "Lost assignment race");
            return Err(AppError::conflict(format!(
                "vehicle {} was assigned to another driver concurrently",
                vehicle.license_plate
            )));
        }

        info!(vehicle_id = %vehicle_id, driver_id = %driver_id, "Driver assigned to vehicle");
        Ok(vehicle)
    }

    pub async fn unassign(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        for _ in 0..SWAP_ATTEMPTS {
            let vehicle = self.vehicle(vehicle_id).await?;
            let Some(current) = vehicle.assigned_driver_id else {
                return Ok(vehicle);
            };

            let swapped = self
                .deps
                .store
                .swap_assigned_driver(vehicle_id, Some(current), None, self.deps.clock.now())
                .await?;
            if swapped {
                info!(vehicle_id = %vehicle_id, driver_id = %current, "Driver unassigned from vehicle");
                return self.vehicle(vehicle_id).await;
            }
        }
        Err(AppError::conflict(format!(
            "assignment of vehicle {vehicle_id} kept changing"
        )))
    }

    /// Release every vehicle pointing at the driver. Zero matches is fine.
    pub async fn unassign_by_driver(&self, driver_id: Uuid) -> AppResult<u64> {
        let released = self
            .deps
            .store
            .clear_assignments_for_driver(driver_id, self.deps.clock.now())
            .await?;
        info!(driver_id = %driver_id, released, "Driver released from vehicles");
        Ok(released)
    }

    /// Hand a vehicle from one driver to another in a single compare-and-set.
    pub async fn transfer(
        &self,
        vehicle_id: Uuid,
        from_driver_id: Uuid,
        to_driver_id: Uuid,
    ) -> AppResult<Vehicle> {
        let vehicle = self.vehicle(vehicle_id).await?;
        self.require_driver(to_driver_id).await?;

        if vehicle.assigned_driver_id != Some(from_driver_id) {
            return Err(AppError::validation(format!(
                "vehicle {} is not assigned to driver {from_driver_id}",
                vehicle.license_plate
            )));
        }
        if from_driver_id == to_driver_id {
            return Ok(vehicle);
        }

        let swapped = self
            .deps
            .store
            .swap_assigned_driver(
                vehicle_id,
                Some(from_driver_id),
                Some(to_driver_id),
                self.deps.clock.now(),
            )
            .await?;
        if !swapped {
            return Err(AppError::validation(format!(
                "vehicle {} is no longer assigned to driver {from_driver_id}",
                vehicle.license_plate
            )));
        }

        info!(
            vehicle_id = %vehicle_id,
            from_driver_id = %from_driver_id,
            to_driver_id = %to_driver_id,
            "Vehicle transferred"
        );
        self.vehicle(vehicle_id).await
    }
}
