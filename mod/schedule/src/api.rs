use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use biblio_core::ServiceError;

use crate::model::{Appointment, AppointmentListQuery, CreateAppointmentBody, SetStatusBody};
use crate::store::ScheduleStore;

type StoreState = Arc<ScheduleStore>;

/// Build the schedule module router.
///
/// Routes:
/// - `POST /appointments`               — book a slot
/// - `GET  /appointments`               — list (email / open filters)
/// - `GET  /appointments/{id}`          — get a booking
/// - `POST /appointments/{id}/@status`  — set PENDING/CONFIRMED/CANCELLED
/// - `POST /appointments/{id}/@cancel`  — cancel an open booking
pub fn router(store: Arc<ScheduleStore>) -> Router {
    Router::new()
        .route("/appointments", post(create).get(list))
        .route("/appointments/{id}", get(get_appointment))
        .route("/appointments/{id}/@status", post(set_status))
        .route("/appointments/{id}/@cancel", post(cancel))
        .with_state(store)
}

async fn create(
    State(store): State<StoreState>,
    Json(body): Json<CreateAppointmentBody>,
) -> Result<(StatusCode, Json<Appointment>), ServiceError> {
    let appointment = store.create(
        &body.name,
        &body.email,
        &body.date,
        &body.time_slot,
        &body.purpose,
        body.notes.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn list(
    State(store): State<StoreState>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, ServiceError> {
    Ok(Json(store.list(&query)?))
}

async fn get_appointment(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(store.get(&id)?))
}

async fn set_status(
    State(store): State<StoreState>,
    Path(id): Path<String>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(store.set_status(&id, body.status)?))
}

async fn cancel(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(store.cancel(&id)?))
}
