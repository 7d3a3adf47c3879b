use std::sync::Arc;

use crate::blob::Blobs;
use crate::clock::{Clock, SystemClock};
use crate::services::{
    AssignmentRegistry, Deps, DocumentRegistry, FleetRegistry, FlowLedger, InspectionRecorder,
    ReportAggregator,
};
use crate::store::FleetStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FleetStore>,
    pub blobs: Blobs,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, blobs: Blobs) -> Self {
        Self::with_clock(store, blobs, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn FleetStore>, blobs: Blobs, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            blobs,
            clock,
        }
    }

    pub fn deps(&self) -> Deps {
        Deps::new(self.store.clone(), self.blobs.clone(), self.clock.clone())
    }

    pub fn fleet(&self) -> FleetRegistry {
        FleetRegistry::new(self.deps())
    }

    pub fn assignments(&self) -> AssignmentRegistry {
        AssignmentRegistry::new(self.deps())
    }

    pub fn documents(&self) -> DocumentRegistry {
        DocumentRegistry::new(self.deps())
    }

    pub fn flows(&self) -> FlowLedger {
        FlowLedger::new(self.deps())
    }

    pub fn inspections(&self) -> InspectionRecorder {
        InspectionRecorder::new(self.deps())
    }

    pub fn reports(&self) -> ReportAggregator {
        ReportAggregator::new(self.deps())
    }
}
