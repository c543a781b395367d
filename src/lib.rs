//! Self-refreshing in-memory values.
//!
//! A [`RefreshableCache`] holds one value that a background task replaces
//! every period with the output of a user producer; failed produces keep the
//! last good value. Every cache joins a process-wide registry so all of them
//! can be refreshed at once with [`registry::fan_out_refresh`].
//!
//! ```no_run
//! use std::time::Duration;
//! use recache::RefreshableCache;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() {
//! let shutdown = CancellationToken::new();
//! let rates = RefreshableCache::new(
//!     Duration::from_secs(30),
//!     || Ok(vec![("EUR", 1.08_f64)]),
//!     shutdown.clone(),
//! );
//! let _current = rates.get();
//!
//! // Refresh every registered cache now, e.g. after a config reload.
//! recache::registry::fan_out_refresh().await;
//! shutdown.cancel();
//! # }
//! ```

#[path = "shared/dedlog/mod.rs"]
pub mod dedlog;
#[cfg(test)]
mod tests;

pub mod cache;
pub mod config;
pub mod error;
pub mod logs;
pub mod metrics;
pub mod registry;

pub use cache::{Builder, RefreshableCache, State};
pub use error::Error;
pub use registry::{Refresher, Registry};
