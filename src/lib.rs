pub mod api;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod export;
pub mod models;
pub mod session;
pub mod timeline;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Demo seed failed: {0}")]
    Seed(#[from] db::seed::SeedError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Initialize tracing. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load config from the environment, seed if asked, serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    let config = config::PortalConfig::from_env()?;
    tracing::info!(
        "{} starting v{} on {}",
        config::APP_NAME,
        config::APP_VERSION,
        config.bind_addr
    );

    let core = Arc::new(core_state::CoreState::new(config));

    if core.config.seed_demo {
        let ids = db::seed::seed_demo_data(
            core.storage(),
            core.config.password_iterations,
            chrono::Utc::now(),
        )?;
        tracing::info!(
            patient_id = ids.patient_id,
            staff_id = ids.staff_id,
            "Demo data loaded"
        );
    }

    let bind_addr = core.config.bind_addr;
    let mut server = api::start_portal_server(core, bind_addr).await?;

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown();
    server.stopped().await;
    Ok(())
}
