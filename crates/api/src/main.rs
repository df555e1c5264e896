use anyhow::{Context, Result};

use wms_api::config::{ApiConfig, ENV_LOG_FORMAT};
use wms_observability::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging comes up first so configuration warnings are captured.
    let raw_log_format = std::env::var(ENV_LOG_FORMAT).ok();
    let log_format = raw_log_format.as_deref().map(LogFormat::parse);
    wms_observability::init_with(log_format.flatten().unwrap_or_default());
    if let (Some(raw), Some(None)) = (&raw_log_format, log_format) {
        tracing::warn!(value = %raw, "unknown {ENV_LOG_FORMAT}; expected json or pretty, using json");
    }

    let config = ApiConfig::from_env()?;
    let app = wms_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
