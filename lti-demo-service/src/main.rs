use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod error;
mod html;
mod launch;
mod lti;
mod state;

use crate::api::AppState;
use crate::db::Database;
use crate::lti::UnverifiedTokenDecoder;
use crate::state::{MemoryStateStore, StateStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting LTI demo service v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config::load_config()?);
    info!(
        host = %config.server.host,
        port = config.server.port,
        platforms = config.lti.platforms.len(),
        "Configuration loaded"
    );
    if config.lti.platforms.is_empty() {
        warn!("No platforms registered; every login will be rejected");
    }

    // Ensure data directory exists
    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Initialize database
    let db_path = config.storage.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let states = Arc::new(MemoryStateStore::new(config.state.ttl()));

    warn!("Launch token signatures are not verified; do not expose this service publicly");
    let validator = Arc::new(UnverifiedTokenDecoder);

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let app_state = Arc::new(
        AppState::new(config.clone(), db, states.clone(), validator).with_metrics(metrics),
    );
    let app = api::router(app_state);

    // Start expired state cleanup background task
    let cleanup_interval = config.state.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = states.purge_expired();
            if removed > 0 {
                info!(removed, remaining = states.len(), "Purged expired states");
            }
        }
    });

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lti_demo_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
