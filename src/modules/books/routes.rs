use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use shelf_http::{AppError, JsonPayload};

use super::models::{BookEnvelope, BookList};
use super::store::BookStore;
use super::validation::validate_book;

/// Book routes, relative to the module mount point.
///
/// `{key}` is a book id for GET and DELETE and an isbn for PUT.
pub fn router(store: Arc<BookStore>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{key}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(store): State<Arc<BookStore>>) -> Json<BookList> {
    let books = store.list().await;
    Json(BookList { books })
}

async fn get_book(
    State(store): State<Arc<BookStore>>,
    Path(id): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = store.find_by_id(&id).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn create_book(
    State(store): State<Arc<BookStore>>,
    JsonPayload(payload): JsonPayload<Value>,
) -> Result<(StatusCode, Json<BookEnvelope>), AppError> {
    let draft = validate_book(&payload)?;
    let book = store.create(draft).await?;
    Ok((StatusCode::CREATED, Json(BookEnvelope { book })))
}

/// Path isbn shape, then existence, then the body: a missing book is
/// reported as 404 whatever the payload, even one that is not JSON.
async fn update_book(
    State(store): State<Arc<BookStore>>,
    Path(isbn): Path<String>,
    body: Result<JsonPayload<Value>, AppError>,
) -> Result<Json<BookEnvelope>, AppError> {
    store.find_by_isbn(&isbn).await?;
    let JsonPayload(payload) = body?;
    let draft = validate_book(&payload)?;
    let book = store.update_by_isbn(&isbn, draft).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn delete_book(
    State(store): State<Arc<BookStore>>,
    Path(id): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = store.delete_by_id(&id).await?;
    Ok(Json(BookEnvelope { book }))
}
