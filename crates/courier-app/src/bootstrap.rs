//! Process boot sequence: configuration, logging, context, listener.

use std::net::SocketAddr;
use std::sync::Arc;

use courier_config::CourierConfig;
use courier_telemetry::{LogFormat, LoggingConfig, Metrics, build_sha, init_logging};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::http::router::CourierServer;

/// Entry point for the courier boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, secret resolution, or the
/// listener fails before serving starts, or if the accept loop fails.
pub async fn run_app() -> AppResult<()> {
    let config = CourierConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    let logging = LoggingConfig {
        level: &config.log.level,
        format: LogFormat::from_setting(config.log.format.as_deref()),
        build_sha: build_sha(),
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    info!(transport = config.transport.as_str(), "courier bootstrap starting");

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let context = AppContext::build(&config, metrics).await?;
    run_with(&config, context).await
}

/// Serve an already-built context until a shutdown signal arrives.
pub(crate) async fn run_with(config: &CourierConfig, context: AppContext) -> AppResult<()> {
    let addr = SocketAddr::new(config.server.bind_addr, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::io("listener.bind", err))?;
    info!(addr = %addr, "launching event listener");

    CourierServer::new(Arc::new(context))
        .serve(listener, shutdown_signal())
        .await?;
    info!("courier shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
