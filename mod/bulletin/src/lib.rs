pub mod api;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::Announcement;
pub use store::BulletinStore;

/// Bulletin module — staff announcements.
pub struct BulletinModule {
    store: Arc<BulletinStore>,
}

impl BulletinModule {
    pub fn new(store: Arc<BulletinStore>) -> Self {
        Self { store }
    }
}

impl Module for BulletinModule {
    fn name(&self) -> &str {
        "bulletin"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.store))
    }
}
