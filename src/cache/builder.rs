use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigTrait};
use crate::registry::{self, Refresher, Registry};

use super::recached::{Producer, RefreshableCache, Shared};
use super::updater;

static SEQ: AtomicUsize = AtomicUsize::new(0);

fn next_default_name() -> String {
    format!("recached-{}", SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Builder configures a [`RefreshableCache`] before its first produce.
pub struct Builder<'r, T> {
    name: Option<String>,
    period: Duration,
    producer: Producer<T>,
    registry: Option<&'r Registry>,
    cfg: Option<&'r Config>,
}

impl<'r, T> Builder<'r, T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    pub(crate) fn new(period: Duration, producer: Producer<T>) -> Self {
        Self {
            name: None,
            period,
            producer,
            registry: None,
            cfg: None,
        }
    }

    /// Names the cache in logs, metrics and config lookups.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers the cache in `registry` instead of the global one.
    pub fn registry(mut self, registry: &'r Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Takes the period from `cfg`: the cache's own section if it has one,
    /// the default refresh period otherwise.
    pub fn configured(mut self, cfg: &'r Config) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Produces the first value, starts the refresh loop and registers the cache.
    pub fn build(self, lifecycle: CancellationToken) -> RefreshableCache<T> {
        let name = self.name.unwrap_or_else(next_default_name);
        let period = match self.cfg {
            Some(cfg) => cfg.period_for(&name),
            None => self.period,
        };

        let shared = Arc::new(Shared::new(
            name,
            period,
            lifecycle,
            T::default(),
            self.producer,
        ));

        shared.update();
        updater::spawn(&shared);

        let entry: Arc<dyn Refresher> = shared.clone();
        let registry = match self.registry {
            Some(registry) => registry,
            None => registry::global(),
        };
        registry.register(Arc::downgrade(&entry));

        RefreshableCache::from_shared(shared)
    }
}
