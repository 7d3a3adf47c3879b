//! Primary result plus the fate of its best-effort follow-up steps.

use serde::Serialize;
use tracing::warn;

use crate::error::AppError;

/// Follow-up steps that run after a primary write and never undo it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Reminder row for a document entering its last 30 days
    ExpiryAlert,
    /// Releasing a blob that is no longer referenced
    BlobCleanup,
    /// Resolving the pending-queue entry an inspection came from
    ResolvePending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum EffectStatus {
    Applied,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectReport {
    pub effect: SideEffect,
    pub status: EffectStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithSideEffects<T> {
    pub value: T,
    pub side_effects: Vec<EffectReport>,
}

impl<T> WithSideEffects<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            side_effects: Vec::new(),
        }
    }

    /// Log and keep the result of a follow-up; failures never propagate.
    pub fn record(&mut self, effect: SideEffect, result: Result<(), AppError>) {
        let status = match result {
            Ok(()) => EffectStatus::Applied,
            Err(err) => {
                warn!(effect = ?effect, error = %err, "Best-effort step failed");
                EffectStatus::Failed(err.to_string())
            }
        };
        self.side_effects.push(EffectReport { effect, status });
    }

    pub fn skip(&mut self, effect: SideEffect) {
        self.side_effects.push(EffectReport {
            effect,
            status: EffectStatus::Skipped,
        });
    }

    pub fn status_of(&self, effect: SideEffect) -> Option<&EffectStatus> {
        self.side_effects
            .iter()
            .find(|report| report.effect == effect)
            .map(|report| &report.status)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithSideEffects<U> {
        WithSideEffects {
            value: f(self.value),
            side_effects: self.side_effects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_follow_up_keeps_primary_value() {
        let mut outcome = WithSideEffects::new(42);
        outcome.record(SideEffect::ExpiryAlert, Err(AppError::conflict("duplicate alert")));
        outcome.skip(SideEffect::BlobCleanup);

        assert_eq!(outcome.value, 42);
        assert!(matches!(
            outcome.status_of(SideEffect::ExpiryAlert),
            Some(EffectStatus::Failed(msg)) if msg.contains("duplicate alert")
        ));
        assert_eq!(outcome.status_of(SideEffect::BlobCleanup), Some(&EffectStatus::Skipped));
        assert_eq!(outcome.status_of(SideEffect::ResolvePending), None);
    }

    #[test]
    fn reports_serialize_with_tagged_status() {
        let mut outcome = WithSideEffects::new("doc");
        outcome.record(SideEffect::ExpiryAlert, Ok(()));
        let json = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(json["side_effects"][0]["effect"], "expiry_alert");
        assert_eq!(json["side_effects"][0]["status"]["state"], "applied");
    }
}
