// Common test utilities: counting and failing producers, polling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counter counts producer invocations across threads.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Producer returning the invocation count, starting at 1.
    pub fn producer(&self) -> impl Fn() -> anyhow::Result<usize> + Send + Sync + 'static {
        let inner = self.0.clone();
        move || Ok(inner.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Switch is a shared on/off flag read by producers.
#[derive(Clone, Default)]
pub struct Switch(Arc<AtomicBool>);

impl Switch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: bool) {
        self.0.store(v, Ordering::SeqCst);
    }

    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Producer that always fails.
pub fn failing<T>() -> impl Fn() -> anyhow::Result<T> + Send + Sync + 'static {
    || Err(anyhow::anyhow!("upstream unavailable"))
}

/// Polls `f` every millisecond until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    f()
}
