use tracing::info;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;

/// Runs the offline sync agent until ctrl-c.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("BreedScan sync agent starting...");

    let app_state = AppState::new(config).await?;
    let handles = app_state.start_background().await;

    match app_state.sync_service.status().await {
        Ok(status) => info!(
            pending = status.pending_uploads,
            last_sync = ?status.last_sync,
            "sync agent ready"
        ),
        Err(err) => tracing::warn!("Failed to read sync status: {}", err),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    app_state.shutdown().await;
    for handle in handles {
        let _ = handle.await;
    }

    info!("BreedScan sync agent stopped");
    Ok(())
}

pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,breedscan_lib=debug,offline=debug,storage=debug,network=debug,remote=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
