// Structured logging setup for applications embedding the caches.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigTrait};
use crate::dedlog;

const DEFAULT_LEVEL: &str = "info";

/// Returns the filter directive: `RUST_LOG` wins over the configured level.
fn filter(cfg: &Config) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    let level = cfg
        .logs()
        .and_then(|logs| logs.level.as_deref())
        .unwrap_or(DEFAULT_LEVEL);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber: JSON in prod, pretty console otherwise.
/// Fails if the host application already installed one.
pub fn configure(cfg: &Config) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter(cfg);
    if cfg.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?;
    }
    Ok(())
}

/// Spawns the deduplicated failure logger on the current runtime, flushing
/// every configured `refresh.dedup_interval` until `shutdown_token` is cancelled.
pub fn start_dedup_logger(
    cfg: &Config,
    shutdown_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let every = cfg.dedup_interval();
    tokio::task::spawn(async move {
        dedlog::start_dedup_logger(shutdown_token, every).await;
    })
}
