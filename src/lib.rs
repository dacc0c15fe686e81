pub mod api;
pub mod config;
pub mod core_state;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Start the service: logging, config, shared state, then the HTTP server.
///
/// The blocking HTTP client inside the analyzer must be built before the
/// async runtime exists, so the runtime is created here by hand.
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env().context("Failed to load configuration")?;
    let bind_addr = config.bind_addr;
    let core = core_state::CoreState::from_config(config).context("Failed to build application state")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime
        .block_on(api::serve(Arc::new(core), bind_addr))
        .with_context(|| format!("API server on {bind_addr} failed"))?;

    Ok(())
}
