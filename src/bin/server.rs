//! Lead search HTTP server.
//!
//! Usage: `lead-harvest-server [CONFIG_PATH]`. Without a path the default
//! config location is used; a missing file means built-in defaults.

use std::path::PathBuf;

use lead_harvest::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("lead-harvest-server starting");

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(ServiceConfig::default_config_path);
    let config = ServiceConfig::load(&path)?;

    lead_harvest::server::run(config).await
}
