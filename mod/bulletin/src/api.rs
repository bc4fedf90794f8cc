use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use biblio_core::ServiceError;

use crate::model::{Announcement, AnnouncementBody};
use crate::store::BulletinStore;

type StoreState = Arc<BulletinStore>;

/// Build the bulletin module router.
pub fn router(store: Arc<BulletinStore>) -> Router {
    Router::new()
        .route("/announcements", get(list).post(create))
        .route("/announcements/{id}", put(update).delete(delete))
        .with_state(store)
}

async fn list(State(store): State<StoreState>) -> Result<Json<Vec<Announcement>>, ServiceError> {
    Ok(Json(store.list()?))
}

async fn create(
    State(store): State<StoreState>,
    Json(body): Json<AnnouncementBody>,
) -> Result<(StatusCode, Json<Announcement>), ServiceError> {
    let announcement = store.create(&body.title, &body.message)?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn update(
    State(store): State<StoreState>,
    Path(id): Path<String>,
    Json(body): Json<AnnouncementBody>,
) -> Result<Json<Announcement>, ServiceError> {
    Ok(Json(store.update(&id, &body.title, &body.message)?))
}

async fn delete(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    store.delete(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
