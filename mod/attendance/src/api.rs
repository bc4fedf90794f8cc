use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use biblio_core::ServiceError;

use crate::model::{OccupancyReport, OpenEntryView, ToggleBody, ToggleOutcome};
use crate::tracker::AttendanceTracker;

type TrackerState = Arc<AttendanceTracker>;

/// Build the attendance module router.
///
/// Routes:
/// - `GET  /occupancy` — current count against capacity
/// - `POST /@toggle`   — check a student in or out
/// - `GET  /entries`   — everyone currently inside
pub fn router(tracker: Arc<AttendanceTracker>) -> Router {
    Router::new()
        .route("/occupancy", get(occupancy))
        .route("/@toggle", post(toggle))
        .route("/entries", get(open_entries))
        .with_state(tracker)
}

async fn occupancy(
    State(tracker): State<TrackerState>,
) -> Result<Json<OccupancyReport>, ServiceError> {
    Ok(Json(tracker.occupancy()?))
}

async fn toggle(
    State(tracker): State<TrackerState>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<ToggleOutcome>, ServiceError> {
    Ok(Json(tracker.toggle(&body.student_id, body.max_capacity)?))
}

async fn open_entries(
    State(tracker): State<TrackerState>,
) -> Result<Json<Vec<OpenEntryView>>, ServiceError> {
    Ok(Json(tracker.open_entries()?))
}
