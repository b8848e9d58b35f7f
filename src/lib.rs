//! Shelf application library
//!
//! Application modules and the wiring that turns them into an HTTP router.

pub mod modules;

use std::sync::Arc;

use axum::Router;
use shelf_kernel::{settings::Settings, ModuleRegistry};

pub use modules::books::{Book, BookStore, BooksModule};

/// Registry holding every application module, sharing `store`
pub fn build_registry(store: Arc<BookStore>) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store)?;
    Ok(registry)
}

/// Full HTTP application over `store`, as served by the binary
pub fn build_app(store: Arc<BookStore>, settings: &Settings) -> anyhow::Result<Router> {
    let registry = build_registry(store)?;
    Ok(shelf_http::build_router(&registry, settings))
}
