mod config;
mod error;
mod routes;

use std::sync::Arc;

use config::AppConfig;
use projsync_core::{Database, SyncCoordinator};
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("projsync_api=info".parse()?)
                .add_directive("projsync_core=info".parse()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting projsync-api with config: {:?}", config);

    let db = Database::open(&config.database_path)?;
    let coordinator = SyncCoordinator::new(db).with_config(config.engine_config());

    let state = AppState::new(Arc::clone(&config), coordinator);
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("projsync-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
