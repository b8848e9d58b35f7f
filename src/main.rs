use std::sync::Arc;

use anyhow::Context;
use shelf_app::{build_registry, BookStore};
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.name,
        "shelf-app bootstrap starting"
    );

    let database = Database::new(&settings.database.name);
    let store = Arc::new(BookStore::new(&database));
    let registry = build_registry(store)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!("shelf-app bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings, shelf_http::shutdown_signal()).await;

    registry
        .stop_modules()
        .await
        .with_context(|| "failed to stop modules cleanly")?;

    served
}
