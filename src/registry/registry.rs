use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, Weak};
use std::thread::{self, Scope};
use std::time::Instant;
use tracing::{debug, warn};

use crate::metrics;

/// Refresher is the only capability the registry holds on a cache.
pub trait Refresher: Send + Sync {
    /// Runs one synchronous refresh attempt. Must not surface producer errors.
    fn refresh(&self);

    /// Name of the cache behind this handle, used in fan-out events.
    fn name(&self) -> &str;
}

type PanicPayload = Box<dyn Any + Send + 'static>;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry every cache joins by default.
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Refreshes every live cache of the global registry concurrently.
pub async fn fan_out_refresh() {
    global().fan_out_refresh().await
}

/// Blocking flavor of [`fan_out_refresh`] for callers outside an async context.
pub fn fan_out_refresh_blocking() {
    global().fan_out_refresh_blocking()
}

/// Registry is an insertion-ordered list of weak refresh handles.
///
/// Entries never keep a cache alive. Entries whose cache is gone are pruned
/// on registration and skipped by fan-outs, so the count of live caches is
/// the only thing a fan-out observes.
pub struct Registry {
    pub(super) entries: RwLock<Vec<Weak<dyn Refresher>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends a handle.
    pub fn register(&self, entry: Weak<dyn Refresher>) {
        let len = {
            let mut entries = self.entries.write();
            entries.retain(|e| e.strong_count() > 0);
            entries.push(entry);
            entries.len()
        };
        metrics::set_registry_len(len);
    }

    /// Number of entries whose cache is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| e.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upgrades the live entries in insertion order. The list lock is released on return.
    pub(super) fn snapshot(&self) -> Vec<Arc<dyn Refresher>> {
        self.entries.read().iter().filter_map(Weak::upgrade).collect()
    }

    /// Refreshes every entry registered at call time and waits for all of them.
    /// Completion order is unspecified.
    ///
    /// The whole fan-out occupies a single blocking-pool slot that drives one
    /// scoped OS thread per entry, so the pool size never caps concurrency.
    ///
    /// # Panics
    /// Re-raises a producer panic once every other refresh has finished.
    pub async fn fan_out_refresh(&self) {
        let entries = self.snapshot();
        let total = entries.len();
        let started = Instant::now();

        let panic = match tokio::task::spawn_blocking(move || refresh_all(&entries)).await {
            Ok(panic) => panic,
            Err(e) if e.is_panic() => Some(e.into_panic()),
            Err(e) => {
                warn!(
                    component = "registry",
                    event = "fan_out_task_cancelled",
                    entries = total,
                    error = %e,
                    "fan-out task did not complete"
                );
                None
            }
        };

        self.finish(total, started);
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
    }

    /// Same contract as [`Registry::fan_out_refresh`], on the caller's thread.
    pub fn fan_out_refresh_blocking(&self) {
        let entries = self.snapshot();
        let total = entries.len();
        let started = Instant::now();

        let panic = refresh_all(&entries);

        self.finish(total, started);
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
    }

    fn finish(&self, total: usize, started: Instant) {
        metrics::add_fan_out(total as u64);
        debug!(
            component = "registry",
            event = "fan_out_done",
            entries = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out refresh completed"
        );
    }
}

/// Refreshes every entry on its own scoped thread and joins them all.
/// Returns the payload of the first panic, if any.
fn refresh_all(entries: &[Arc<dyn Refresher>]) -> Option<PanicPayload> {
    thread::scope(|scope| {
        let handles: Vec<_> = entries
            .iter()
            .map(|entry| (entry, spawn_refresh(scope, entry)))
            .collect();

        let mut panic = None;
        for (entry, handle) in handles {
            let Some(handle) = handle else { continue };
            if let Err(payload) = handle.join() {
                warn!(
                    component = "registry",
                    event = "fan_out_refresh_panicked",
                    cache = %entry.name(),
                    "refresh panicked during fan-out"
                );
                panic.get_or_insert(payload);
            }
        }
        panic
    })
}

/// Spawns one refresh. When the OS refuses another thread the refresh runs
/// inline and `None` is returned.
fn spawn_refresh<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    entry: &'env Arc<dyn Refresher>,
) -> Option<thread::ScopedJoinHandle<'scope, ()>> {
    let spawned = thread::Builder::new()
        .name(format!("recache-fan-out-{}", entry.name()))
        .spawn_scoped(scope, move || entry.refresh());
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(
                component = "registry",
                event = "fan_out_spawn_failed",
                cache = %entry.name(),
                error = %e,
                "refreshing inline"
            );
            entry.refresh();
            None
        }
    }
}
