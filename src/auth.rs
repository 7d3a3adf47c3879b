use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Principal forwarded by the upstream auth gate.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    pub fn is_fleet_manager(&self) -> bool {
        self.role.eq_ignore_ascii_case("fleet_manager")
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            warn!(header = name, "Missing principal header");
            AppError::validation(format!("missing {name} header"))
        })
}

/// Extract CurrentUser from the X-User-Id / X-User-Role headers
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header(parts, USER_ID_HEADER)?;
        let id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::validation(format!("{USER_ID_HEADER} must be a UUID")))?;
        let role = header(parts, USER_ROLE_HEADER)?.to_string();

        debug!(user_id = %id, role = %role, "Principal accepted");
        Ok(CurrentUser { id, role })
    }
}

/// Actions gated by role at the boundary
#[derive(Debug, Clone, Copy)]
pub enum FleetAction {
    Read,
    /// Create, update or delete vehicles and drivers
    ManageFleet,
    /// Assign, unassign or transfer vehicles
    Assign,
}

/// Check if a user may perform a fleet action
pub fn check_permission(user: &CurrentUser, action: FleetAction) -> Result<(), AppError> {
    match action {
        FleetAction::Read => Ok(()),
        FleetAction::ManageFleet | FleetAction::Assign => {
            if user.is_admin() || user.is_fleet_manager() {
                Ok(())
            } else {
                warn!(user_id = %user.id, role = %user.role, action = ?action, "Permission denied");
                Err(AppError::validation(
                    "Permission denied: admin or fleet_manager role required",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role: role.to_string(),
        }
    }

    #[test]
    fn fleet_mutation_needs_admin_or_fleet_manager() {
        assert!(check_permission(&user("admin"), FleetAction::ManageFleet).is_ok());
        assert!(check_permission(&user("fleet_manager"), FleetAction::Assign).is_ok());
        assert!(matches!(
            check_permission(&user("driver"), FleetAction::ManageFleet),
            Err(AppError::Validation(_))
        ));
        assert!(check_permission(&user("driver"), FleetAction::Read).is_ok());
    }
}
