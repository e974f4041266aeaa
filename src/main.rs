//! Circulation Desk server
//!
//! REST API server for library lending, reservations and fines.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation_desk::{
    api,
    circulation::SystemClock,
    config::AppConfig,
    repository::{JsonFileStore, Repository},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("circulation_desk={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Circulation Desk v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonFileStore::open(&config.storage.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to open data directory {}",
                config.storage.data_dir.display()
            )
        })?;
    tracing::info!(data_dir = %store.data_dir().display(), "Opened JSON store");

    let repository = Repository::load(Arc::new(store), config.circulation.clone())
        .await
        .context("Failed to load circulation snapshot")?;
    let services = Services::new(repository, Arc::new(SystemClock), config.auth.clone());

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
