pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_kernel::{InitCtx, Module};

pub use models::{Book, BookDraft};
pub use store::{BookStore, StoreError};
pub use validation::{validate_book, ValidationError};

/// Book catalogue module: CRUD routes over a shared [`BookStore`]
pub struct BooksModule {
    store: Arc<BookStore>,
}

impl BooksModule {
    pub fn new(store: Arc<BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.store.count().await;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let books = self.store.count().await;
        tracing::info!(module = self.name(), books, "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookEnvelope" }
            }
        }
    })
}

fn path_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn book_body() -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookPayload" }
            }
        }
    })
}

fn openapi_fragment() -> Value {
    let id_param = path_param("key", "Book id, 24 hex characters");
    let isbn_param = path_param("key", "ISBN-10 or ISBN-13 of the book to replace");

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookList" }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body(),
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Invalid payload"),
                        "409": error_response("Isbn already in use")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            },
            "/{key}": {
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": error_response("Malformed id"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book found by isbn",
                    "tags": ["Books"],
                    "parameters": [isbn_param],
                    "requestBody": book_body(),
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Malformed isbn or invalid payload"),
                        "404": error_response("Book not found"),
                        "409": error_response("New isbn already in use")
                    }
                },
                "delete": {
                    "summary": "Delete a book by id",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": book_response("Deleted book"),
                        "400": error_response("Malformed id"),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "BookPayload": {
                    "type": "object",
                    "properties": {
                        "isbn": { "type": "string", "description": "ISBN-10 or ISBN-13" },
                        "amazon-url": { "type": "string", "format": "uri" },
                        "author": { "type": "string" },
                        "language": { "type": "string" },
                        "pages": { "type": "integer", "minimum": 0 },
                        "publisher": { "type": "string" },
                        "title": { "type": "string" },
                        "year": { "type": "integer" }
                    },
                    "required": ["isbn", "title"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Store-assigned id" },
                        "isbn": { "type": "string" },
                        "amazon-url": { "type": "string", "format": "uri" },
                        "author": { "type": "string" },
                        "language": { "type": "string" },
                        "pages": { "type": "integer", "minimum": 0 },
                        "publisher": { "type": "string" },
                        "title": { "type": "string" },
                        "year": { "type": "integer" }
                    },
                    "required": ["id", "isbn", "title"]
                },
                "BookEnvelope": {
                    "type": "object",
                    "properties": {
                        "book": { "$ref": "#/components/schemas/Book" }
                    },
                    "required": ["book"]
                },
                "BookList": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        }
                    },
                    "required": ["books"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
