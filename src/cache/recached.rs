use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dedlog;
use crate::error::Error;
use crate::metrics;
use crate::registry::Refresher;

use super::builder::Builder;

/// Producer computes a fresh value; an `Err` leaves the cached value untouched.
pub type Producer<T> = Box<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// Lifecycle state of a cache's automatic refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The background loop refreshes the value every period.
    Running,
    /// The lifecycle signal fired. Reads and manual refreshes still work.
    Stopped,
}

/// State shared between the cache handles, the refresh loop and the registry.
pub(crate) struct Shared<T> {
    pub(crate) name: String,
    pub(crate) period: Duration,
    pub(crate) lifecycle: CancellationToken,
    value: RwLock<T>,
    producer: Producer<T>,
}

impl<T> Shared<T>
where
    T: Send + Sync,
{
    pub(crate) fn new(
        name: String,
        period: Duration,
        lifecycle: CancellationToken,
        initial: T,
        producer: Producer<T>,
    ) -> Self {
        Self {
            name,
            period,
            lifecycle,
            value: RwLock::new(initial),
            producer,
        }
    }

    fn produce(&self) -> Result<T, Error> {
        (self.producer)().map_err(|source| Error::ProducerFailed {
            cache: self.name.clone(),
            source: source.into(),
        })
    }

    /// One producer invocation. The write lock is taken only to swap in a produced value.
    pub(crate) fn update(&self) {
        match self.produce() {
            Ok(value) => {
                let previous = std::mem::replace(&mut *self.value.write(), value);
                drop(previous);
                metrics::add_updated(&self.name);
            }
            Err(err) => {
                debug!(
                    component = "recached",
                    event = "refresh_failed",
                    cache = %self.name,
                    error = %err,
                    "refresh failed, keeping the last value"
                );
                dedlog::err(&self.name, &err);
                metrics::add_errors(&self.name);
            }
        }
    }
}

impl<T> Refresher for Shared<T>
where
    T: Send + Sync,
{
    fn refresh(&self) {
        self.update();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// RefreshableCache holds one value of `T` that a background task keeps fresh
/// by calling the producer every `period`.
///
/// Handles are cheap to clone and all observe the same value. The refresh
/// loop and the registry hold only weak references, so the cache lives as
/// long as its handles do.
pub struct RefreshableCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RefreshableCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for RefreshableCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshableCache")
            .field("name", &self.shared.name)
            .field("period", &self.shared.period)
            .field("stopped", &self.shared.lifecycle.is_cancelled())
            .finish()
    }
}

impl<T> RefreshableCache<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Creates a cache registered in the global registry.
    ///
    /// Calls the producer once before returning, so a producer that succeeds
    /// synchronously is never observed as `T::default()`. A failure there is
    /// swallowed like any other. The background loop stops for good once
    /// `lifecycle` is cancelled. Any period is accepted; zero refreshes back
    /// to back.
    ///
    /// Inside a Tokio runtime the loop is a task on that runtime and ends when
    /// the runtime shuts down, while `state()` keeps reporting `Running` until
    /// `lifecycle` fires. Build long-lived caches on the long-lived runtime, or
    /// outside any runtime to get a dedicated refresh thread.
    pub fn new<F>(period: Duration, producer: F, lifecycle: CancellationToken) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::builder(period, producer).build(lifecycle)
    }

    /// Starts a builder for a named, configured or privately registered cache.
    pub fn builder<'r, F>(period: Duration, producer: F) -> Builder<'r, T>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Builder::new(period, Box::new(producer))
    }

    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Returns a copy of the current value. Never calls the producer.
    pub fn get(&self) -> T {
        self.shared.value.read().clone()
    }

    /// Reads the current value in place under the shared lock.
    /// Keep `f` short: writers wait for it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.value.read())
    }

    /// Calls the producer once and stores its value on success.
    ///
    /// Failures are swallowed and the previous value stays. Concurrent calls
    /// are not coalesced, each one invokes the producer. Does not reset the
    /// periodic timer.
    pub fn refresh(&self) {
        self.shared.update();
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    pub fn state(&self) -> State {
        if self.shared.lifecycle.is_cancelled() {
            State::Stopped
        } else {
            State::Running
        }
    }
}
