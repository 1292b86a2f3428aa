use clap::Args;
use obs_config::{ServerConfig, DEFAULT_ADDRESS, DEFAULT_DATABASE_URL};
use obs_database::DbConnection;
use obs_ingest::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on closing the database pool after the server stopped
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = DEFAULT_ADDRESS, env = "OBS_ADDRESS")]
    pub address: String,

    /// Database connection URL (sqlite or postgres)
    #[arg(long, default_value = DEFAULT_DATABASE_URL, env = "OBS_DATABASE_URL")]
    pub database_url: String,

    /// Shared secret expected in the X-OBS-Key header
    #[arg(long, env = "OBS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = ServerConfig::new(&self.address, self.database_url, self.api_key)?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(serve(config))
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    debug!("Initializing database connection...");
    let db =
        obs_database::establish_connection(&config.database_url, config.pool_settings()).await?;

    let state = Arc::new(AppState::new(db.clone(), config.api_key.clone()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.address).await?;
    info!("Starting obs ingestion gateway on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if tokio::time::timeout(CLEANUP_TIMEOUT, close_database(db))
        .await
        .is_err()
    {
        warn!("Database cleanup timed out after {:?}", CLEANUP_TIMEOUT);
    }

    info!("Graceful shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, initiating graceful shutdown...");
}

async fn close_database(db: Arc<DbConnection>) {
    match Arc::try_unwrap(db) {
        Ok(db) => {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                debug!("Database connection closed successfully");
            }
        }
        Err(_) => {
            debug!("Database still has other references, skipping close");
        }
    }
}
