//! Book persistence on top of a `shelf-db` collection.

use serde_json::json;
use shelf_db::{Collection, Database, DbError, ObjectId};
use shelf_http::AppError;
use thiserror::Error;

use super::models::{Book, BookDraft};
use super::validation::{is_isbn, ValidationError};

const COLLECTION: &str = "books";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("'{0}' is not a valid book id")]
    InvalidId(String),

    #[error("'{0}' is not a valid isbn")]
    InvalidIsbn(String),

    #[error("no book with {key} '{value}'")]
    NotFound { key: &'static str, value: String },

    #[error("a book with isbn '{0}' already exists")]
    DuplicateIsbn(String),

    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateKey { value, .. } => StoreError::DuplicateIsbn(value),
            DbError::InvalidObjectId(value) => StoreError::InvalidId(value),
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::InvalidId(_) | StoreError::InvalidIsbn(_) => AppError::format(message),
            StoreError::NotFound { .. } => AppError::not_found(message),
            StoreError::DuplicateIsbn(isbn) => AppError::conflict(
                vec![json!({"field": "isbn", "error": "duplicate", "value": isbn})],
                message,
            ),
            StoreError::Database(db) => AppError::Internal(anyhow::Error::new(db)),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let details = err.violations.iter().map(|v| v.to_detail()).collect();
        AppError::validation(details, err.to_string())
    }
}

/// Data-access object for books. Isbn is unique across the store.
pub struct BookStore {
    books: Collection<Book>,
}

impl BookStore {
    pub fn new(db: &Database) -> Self {
        let books = db
            .collection::<Book>(COLLECTION)
            .with_unique_index("isbn", |book: &Book| book.isbn.clone());
        Self { books }
    }

    /// Store backed by a private database, for isolated tests and tools.
    pub fn in_memory() -> Self {
        Self::new(&Database::new("memory"))
    }

    pub async fn create(&self, draft: BookDraft) -> Result<Book, StoreError> {
        let book = self
            .books
            .insert_one(|id| draft.into_book(id))
            .await?;

        tracing::info!(id = %book.id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Book, StoreError> {
        let id = parse_id(id)?;
        self.books
            .find_by_id(&id)
            .await
            .ok_or_else(|| not_found("id", id.to_hex()))
    }

    pub async fn find_by_isbn(&self, isbn: &str) -> Result<Book, StoreError> {
        check_isbn(isbn)?;
        self.books
            .find_one(|book| book.isbn == isbn)
            .await
            .ok_or_else(|| not_found("isbn", isbn.to_string()))
    }

    /// Every book, oldest first.
    pub async fn list(&self) -> Vec<Book> {
        self.books.find_all().await
    }

    /// Replace all fields of the book currently holding `isbn`.
    pub async fn update_by_isbn(&self, isbn: &str, draft: BookDraft) -> Result<Book, StoreError> {
        check_isbn(isbn)?;
        let book = self
            .books
            .replace_one(|book| book.isbn == isbn, |current| current.replaced_with(draft))
            .await?
            .ok_or_else(|| not_found("isbn", isbn.to_string()))?;

        tracing::info!(id = %book.id, from = %isbn, isbn = %book.isbn, "book updated");
        Ok(book)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<Book, StoreError> {
        let id = parse_id(id)?;
        let book = self
            .books
            .delete_by_id(&id)
            .await
            .ok_or_else(|| not_found("id", id.to_hex()))?;

        tracing::info!(id = %book.id, isbn = %book.isbn, "book deleted");
        Ok(book)
    }

    /// Delete every book; returns how many were removed.
    pub async fn remove_all(&self) -> usize {
        let removed = self.books.delete_many().await;
        tracing::info!(removed, "all books removed");
        removed
    }

    pub async fn count(&self) -> usize {
        self.books.count().await
    }
}

fn parse_id(raw: &str) -> Result<ObjectId, StoreError> {
    Ok(ObjectId::parse_str(raw)?)
}

fn check_isbn(raw: &str) -> Result<(), StoreError> {
    if is_isbn(raw) {
        Ok(())
    } else {
        Err(StoreError::InvalidIsbn(raw.to_string()))
    }
}

fn not_found(key: &'static str, value: String) -> StoreError {
    StoreError::NotFound { key, value }
}
