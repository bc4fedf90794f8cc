pub mod api;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::{Appointment, AppointmentStatus};
pub use store::ScheduleStore;

/// Schedule module — study-room appointment booking.
pub struct ScheduleModule {
    store: Arc<ScheduleStore>,
}

impl ScheduleModule {
    pub fn new(store: Arc<ScheduleStore>) -> Self {
        Self { store }
    }
}

impl Module for ScheduleModule {
    fn name(&self) -> &str {
        "schedule"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.store))
    }
}
