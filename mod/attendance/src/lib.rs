pub mod api;
pub mod model;
pub mod store;
pub mod tracker;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::{AttendanceEntry, ToggleAction};
pub use store::AttendanceStore;
pub use tracker::{AttendanceConfig, AttendanceTracker};

/// Attendance module — capacity-constrained presence tracking.
pub struct AttendanceModule {
    tracker: Arc<AttendanceTracker>,
}

impl AttendanceModule {
    pub fn new(tracker: Arc<AttendanceTracker>) -> Self {
        Self { tracker }
    }
}

impl Module for AttendanceModule {
    fn name(&self) -> &str {
        "attendance"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.tracker))
    }
}
