pub mod api;
pub mod client;
pub mod models;
pub mod processor;
pub mod render;
pub mod report;
pub mod services;
pub mod storage;

use common::config::Settings;
use common::Result;
use services::ProfilerService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}

/// Serves the profiler API until the process is stopped.
pub async fn run_server(config_path: &str) -> Result<()> {
    let config = Settings::new(config_path)?;
    let service = Arc::new(ProfilerService::new(&config));

    let api_router = api::routes(Arc::clone(&service));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.api_port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Profiler API server listening");
    axum::serve(listener, api_router).await?;

    Ok(())
}
