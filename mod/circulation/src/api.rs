use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use biblio_core::ServiceError;

use crate::model::{
    BorrowRecord, BorrowRequest, DirectBorrowBody, LoanListQuery, RequestListQuery, ResolveBody,
    ResolveOutcome, ReturnBody, ReturnOutcome, StatsQuery, SubmitRequestBody,
};
use crate::service::CirculationService;

type ServiceState = Arc<CirculationService>;

/// Build the circulation module router.
///
/// Routes:
/// - `POST /requests`               — submit a borrow request
/// - `GET  /requests`               — list requests (librarian queue)
/// - `GET  /requests/{id}`          — get a request
/// - `POST /requests/{id}/@resolve` — accept or reject a pending request
/// - `POST /returns`                — return a copy
/// - `POST /loans`                  — librarian-initiated direct loan
/// - `GET  /loans`                  — list loans (student / status / overdue)
/// - `GET  /stats`                  — dashboard counters
pub fn router(service: Arc<CirculationService>) -> Router {
    Router::new()
        .route("/requests", post(submit_request).get(list_requests))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/@resolve", post(resolve_request))
        .route("/returns", post(return_copy))
        .route("/loans", post(direct_borrow).get(list_loans))
        .route("/stats", get(stats))
        .with_state(service)
}

async fn submit_request(
    State(service): State<ServiceState>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let request = service.submit_request(
        &body.copy_id,
        &body.student_id,
        &body.pickup_date,
        &body.pickup_time,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "requestId": request.id,
            "message": "Borrow request submitted successfully.",
        })),
    ))
}

async fn list_requests(
    State(service): State<ServiceState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = service.list_requests(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn get_request(
    State(service): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<BorrowRequest>, ServiceError> {
    Ok(Json(service.get_request(&id)?))
}

async fn resolve_request(
    State(service): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<ResolveOutcome>, ServiceError> {
    Ok(Json(service.resolve_request(&id, body.decision)?))
}

async fn return_copy(
    State(service): State<ServiceState>,
    Json(body): Json<ReturnBody>,
) -> Result<Json<ReturnOutcome>, ServiceError> {
    Ok(Json(service.return_copy(&body.copy_id)?))
}

async fn direct_borrow(
    State(service): State<ServiceState>,
    Json(body): Json<DirectBorrowBody>,
) -> Result<(StatusCode, Json<BorrowRecord>), ServiceError> {
    let record = service.direct_borrow(&body.copy_id, &body.student_id)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_loans(
    State(service): State<ServiceState>,
    Query(query): Query<LoanListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = service.list_loans(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn stats(
    State(service): State<ServiceState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    match query.student_id {
        Some(student_id) => {
            let summary = service.student_summary(&student_id)?;
            Ok(Json(serde_json::to_value(summary).map_err(|e| {
                ServiceError::Internal(e.to_string())
            })?))
        }
        None => {
            let stats = service.library_stats()?;
            Ok(Json(serde_json::to_value(stats).map_err(|e| {
                ServiceError::Internal(e.to_string())
            })?))
        }
    }
}
