//! Catalog Sync Main Entry Point
//!
//! This is the main binary for the storefront catalog sync. It pulls ERP
//! entities into the embedded SQLite read cache, batch by batch, then
//! rebuilds hierarchy paths for tree-shaped entities.

use catalog_sync::{CatalogSyncError, Dependencies};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_sync=info,catalog_sync_repository=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(
        service_name = "catalog-sync",
        service_version = env!("CARGO_PKG_VERSION"),
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), CatalogSyncError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting catalog sync");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.runner.run_all(&deps.options).await {
        Ok(reports) => {
            for report in &reports {
                // One JSON line per entity for dashboards and cron logs.
                match serde_json::to_string(report) {
                    Ok(line) => println!("{line}"),
                    Err(e) => error!(error = %e, "Failed to serialize run report"),
                }
            }
            info!("Catalog sync completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Catalog sync failed");
            Err(e.into())
        }
    }
}
