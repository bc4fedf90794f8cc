pub mod api;
pub mod model;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::{BorrowRecord, BorrowRequest, Decision, LoanStatus, RequestStatus};
pub use service::{CirculationConfig, CirculationService};
pub use store::CirculationStore;

/// Circulation module — the borrow ledger and its lifecycle coordinator.
pub struct CirculationModule {
    service: Arc<CirculationService>,
}

impl CirculationModule {
    pub fn new(service: Arc<CirculationService>) -> Self {
        Self { service }
    }
}

impl Module for CirculationModule {
    fn name(&self) -> &str {
        "circulation"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
