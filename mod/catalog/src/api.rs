use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use biblio_core::ServiceError;

use crate::model::{
    AddBookRequest, AddCopyRequest, Book, BookListQuery, BookOverview, Category, Copy,
    CopyDetail, SetCopyStatusRequest, UpdateBookRequest,
};
use crate::store::CatalogStore;

type StoreState = Arc<CatalogStore>;

/// Build the catalog module router.
///
/// Routes:
/// - `GET    /books`                — list/search books with copy counts
/// - `POST   /books`                — add a book (plus initial copies)
/// - `GET    /books/{id}`           — get book metadata
/// - `PUT    /books/{id}`           — edit book metadata
/// - `DELETE /books/{id}`           — delete book and its copies
/// - `GET    /books/{id}/copies`    — list a book's copies
/// - `POST   /copies`               — add a copy to a book
/// - `GET    /copies/{id}`          — get a copy with book metadata
/// - `POST   /copies/{id}/@status`  — mark LOST/DAMAGED/MISSING/AVAILABLE
/// - `GET    /categories`           — the closed category list
pub fn router(store: Arc<CatalogStore>) -> Router {
    Router::new()
        .route("/books", get(list_books).post(add_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/{id}/copies", get(list_copies))
        .route("/copies", post(add_copy))
        .route("/copies/{id}", get(get_copy))
        .route("/copies/{id}/@status", post(set_copy_status))
        .route("/categories", get(list_categories))
        .with_state(store)
}

async fn list_books(
    State(store): State<StoreState>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = store.list_books(&query)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn add_book(
    State(store): State<StoreState>,
    Json(req): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<BookOverview>), ServiceError> {
    let added = store.add_book(&req.title, &req.author, &req.isbn, req.category, req.copies)?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn get_book(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ServiceError> {
    Ok(Json(store.get_book(&id)?))
}

async fn update_book(
    State(store): State<StoreState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<Book>, ServiceError> {
    let book = store.update_book(&id, &req.title, &req.author, &req.isbn, req.category)?;
    Ok(Json(book))
}

async fn delete_book(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    store.delete_book(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn list_copies(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Copy>>, ServiceError> {
    Ok(Json(store.list_copies(&id)?))
}

async fn add_copy(
    State(store): State<StoreState>,
    Json(req): Json<AddCopyRequest>,
) -> Result<(StatusCode, Json<Copy>), ServiceError> {
    let copy = store.add_copy(&req.book_id)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn get_copy(
    State(store): State<StoreState>,
    Path(id): Path<String>,
) -> Result<Json<CopyDetail>, ServiceError> {
    Ok(Json(store.get_copy_detail(&id)?))
}

async fn set_copy_status(
    State(store): State<StoreState>,
    Path(id): Path<String>,
    Json(req): Json<SetCopyStatusRequest>,
) -> Result<Json<Copy>, ServiceError> {
    Ok(Json(store.set_copy_status(&id, req.status)?))
}

async fn list_categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(|c| c.as_str()).collect())
}
