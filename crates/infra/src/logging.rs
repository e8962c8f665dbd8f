use crate::config::AppConfig;
use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_new(config.log_level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);
    let installed = if config.is_production() {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|err| anyhow::anyhow!("tracing subscriber init failed: {err}"))?;

    tracing::debug!(
        app_env = %config.app_env,
        log_level = %config.log_level,
        "tracing initialized"
    );
    Ok(())
}
