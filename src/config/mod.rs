// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::Error;

pub mod test_config;

pub use test_config::new_test_config;

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
pub const TEST: &str = "test";

/// Default period for caches built from config without their own section.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);
/// Default window over which repeated producer failures are collapsed.
pub const DEFAULT_DEDUP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recache {
    #[serde(rename = "recache")]
    pub recache: RecacheBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecacheBox {
    #[serde(default = "default_env")]
    pub env: String,
    pub logs: Option<Logs>,
    pub refresh: Option<Refresh>,
    pub caches: Option<HashMap<String, CacheRule>>,
}

fn default_env() -> String {
    DEV.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Refresh {
    #[serde(default, with = "humantime_serde")]
    pub period: Option<Duration>,
    #[serde(rename = "dedup_interval", default, with = "humantime_serde")]
    pub dedup_interval: Option<Duration>,
}

/// Per-cache overrides, keyed by cache name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheRule {
    #[serde(default, with = "humantime_serde")]
    pub period: Option<Duration>,
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    fn is_dev(&self) -> bool;
    fn is_test(&self) -> bool;
    fn refresh(&self) -> Option<&Refresh>;
    fn default_period(&self) -> Duration;
    fn dedup_interval(&self) -> Duration;
    fn period_for(&self, name: &str) -> Duration;
}

// Config type alias for convenience
pub type Config = Recache;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.recache.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.recache.env == PROD
    }

    fn is_dev(&self) -> bool {
        self.recache.env == DEV
    }

    fn is_test(&self) -> bool {
        self.recache.env == TEST
    }

    fn refresh(&self) -> Option<&Refresh> {
        self.recache.refresh.as_ref()
    }

    fn default_period(&self) -> Duration {
        self.refresh()
            .and_then(|r| r.period)
            .unwrap_or(DEFAULT_PERIOD)
    }

    fn dedup_interval(&self) -> Duration {
        self.refresh()
            .and_then(|r| r.dedup_interval)
            .unwrap_or(DEFAULT_DEDUP_INTERVAL)
    }

    fn period_for(&self, name: &str) -> Duration {
        self.recache
            .caches
            .as_ref()
            .and_then(|caches| caches.get(name))
            .and_then(|rule| rule.period)
            .unwrap_or_else(|| self.default_period())
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_yaml(&raw).with_context(|| format!("failed to parse config file {:?}", path))
    }

    /// Parses configuration from a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("failed to decode yaml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        match self.recache.env.as_str() {
            PROD | DEV | TEST => {}
            other => {
                return Err(Error::Config(format!(
                    "unknown env {other:?}, expected one of {PROD}, {DEV}, {TEST}"
                ))
                .into())
            }
        }
        if let Some(interval) = self.refresh().and_then(|r| r.dedup_interval) {
            // tokio::time::interval panics on a zero period
            if interval.is_zero() {
                return Err(Error::Config("refresh.dedup_interval must be positive".into()).into());
            }
        }
        Ok(())
    }
}
