pub mod api;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use biblio_core::Module;

pub use model::{Book, BookOverview, Category, Copy, CopyDetail, CopyStatus};
pub use store::CatalogStore;

/// Catalog module — book and copy management.
pub struct CatalogModule {
    store: Arc<CatalogStore>,
}

impl CatalogModule {
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self { store }
    }
}

impl Module for CatalogModule {
    fn name(&self) -> &str {
        "catalog"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.store))
    }
}
