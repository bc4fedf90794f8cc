pub mod api;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::Student;
pub use store::StudentStore;

/// Directory module — the student registry consumed by circulation and
/// attendance for existence and name lookups.
pub struct DirectoryModule {
    store: Arc<StudentStore>,
}

impl DirectoryModule {
    pub fn new(store: Arc<StudentStore>) -> Self {
        Self { store }
    }
}

impl Module for DirectoryModule {
    fn name(&self) -> &str {
        "directory"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.store))
    }
}
