use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use biblio_core::{ListParams, ServiceError};

use crate::model::{RegisterStudentRequest, Student, VerifyQuery};
use crate::store::StudentStore;

type StoreState = Arc<StudentStore>;

/// Build the directory module router.
///
/// Routes:
/// - `POST   /students`       — register a student
/// - `GET    /students`       — list students
/// - `GET    /students/{id}`  — get a student
/// - `DELETE /students/{id}`  — remove a student
/// - `GET    /verify?id=`     — resolve a scanned badge id
pub fn router(store: Arc<StudentStore>) -> Router {
    Router::new()
        .route("/students", post(register_student).get(list_students))
        .route("/students/{id}", get(get_student).delete(delete_student))
        .route("/verify", get(verify))
        .with_state(store)
}

async fn register_student(
    State(store): State<StoreState>,
    Json(req): Json<RegisterStudentRequest>,
) -> Result<(StatusCode, Json<Student>), ServiceError> {
    let student = store.register(&req.id, &req.name, &req.email, req.grade_level.as_deref())?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn list_students(
    State(store): State<StoreState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = store.list(params.limit, params.offset)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn get_student(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<Student>, ServiceError> {
    Ok(Json(store.get(&id)?))
}

async fn delete_student(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    store.delete(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn verify(
    State(store): State<StoreState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<Student>, ServiceError> {
    Ok(Json(store.verify(&query.id)?))
}
