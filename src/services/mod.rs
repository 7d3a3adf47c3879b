//! Core operations over the store, blob and clock collaborators.

use std::fmt::Display;
use std::sync::Arc;

use crate::blob::Blobs;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::store::FleetStore;

pub mod assignment;
pub mod documents;
pub mod fleet;
pub mod flow;
pub mod inspections;
pub mod reports;

pub use assignment::AssignmentRegistry;
pub use documents::DocumentRegistry;
pub use fleet::FleetRegistry;
pub use flow::FlowLedger;
pub use inspections::InspectionRecorder;
pub use reports::ReportAggregator;

/// Collaborators every service is built from.
#[derive(Clone)]
pub struct Deps {
    pub store: Arc<dyn FleetStore>,
    pub blobs: Blobs,
    pub clock: Arc<dyn Clock>,
}

impl Deps {
    pub fn new(store: Arc<dyn FleetStore>, blobs: Blobs, clock: Arc<dyn Clock>) -> Self {
        Self { store, blobs, clock }
    }
}

pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, what: impl Display) -> AppResult<T>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, what: impl Display) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(what.to_string()))
    }
}

/// Trimmed value of a required text field.
pub(crate) fn required_text(value: Option<&str>, field: &str) -> AppResult<String> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

/// Blank strings become `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
