use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::TripType;
use crate::outcome::{EffectReport, WithSideEffects};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub from_driver_id: Uuid,
    pub to_driver_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawalRequest {
    pub document_id: Uuid,
    pub driver_id: Uuid,
    #[serde(default)]
    pub expected_return_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub document_id: Uuid,
    pub driver_id: Uuid,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkInspectedRequest {
    #[serde(default)]
    pub inspection_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TripTypeQuery {
    pub trip_type: Option<TripType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OverdueQuery {
    pub trip_type: TripType,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConditionCheckQuery {
    pub vehicle_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FlowWindowQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Count of rows a bulk operation touched.
#[derive(Debug, Serialize, ToSchema)]
pub struct AffectedResponse {
    pub affected: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Primary result of a write plus the state of its follow-up steps.
///
/// `side_effects` entries look like
/// `{"effect": "blob_cleanup", "status": {"state": "failed", "detail": "..."}}`.
#[derive(Debug, Serialize)]
pub struct EffectsResponse<T> {
    pub data: T,
    pub side_effects: Vec<EffectReport>,
}

impl<T> From<WithSideEffects<T>> for EffectsResponse<T> {
    fn from(outcome: WithSideEffects<T>) -> Self {
        Self {
            data: outcome.value,
            side_effects: outcome.side_effects,
        }
    }
}
