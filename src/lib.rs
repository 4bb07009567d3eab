pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod notify;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::core_state::{CoreError, CoreState};

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), CoreError> {
    // HEALTHPASS_LOG wins over RUST_LOG; otherwise the built-in default.
    let filter = std::env::var("HEALTHPASS_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(config::default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::ServiceConfig::from_env()?;
    let bind_addr = config.bind_addr;
    tracing::info!(
        environment = ?config.environment,
        store = ?config.store,
        max_batch_size = config.max_batch_size,
        conflict_retries = config.conflict_retries,
        "Configuration loaded"
    );

    let core = Arc::new(CoreState::from_config(config)?);
    let mut server = api::start_api_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.local_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.wait().await;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
