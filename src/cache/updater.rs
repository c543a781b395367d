// Background refresh loop, one per cache.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::recached::Shared;

/// Starts the refresh loop of `shared` on the current Tokio runtime, or on a
/// dedicated thread driving its own runtime when called outside of one.
pub(crate) fn spawn<T>(shared: &Arc<Shared<T>>)
where
    T: Send + Sync + 'static,
{
    let cache = Arc::downgrade(shared);
    let period = shared.period;
    let lifecycle = shared.lifecycle.clone();
    let name = shared.name.clone();

    if let Ok(handle) = Handle::try_current() {
        handle.spawn(run(cache, period, lifecycle, name));
        return;
    }

    let thread_name = format!("recache-{name}");
    let spawned = std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(run(cache, period, lifecycle, name)),
                Err(e) => error!(
                    component = "recached",
                    event = "loop_start_failed",
                    cache = %name,
                    error = %e,
                    "failed to build runtime for refresh loop"
                ),
            }
        });
    if let Err(e) = spawned {
        error!(
            component = "recached",
            event = "loop_start_failed",
            thread = %thread_name,
            error = %e,
            "failed to spawn refresh loop thread"
        );
    }
}

/// Waits for the period or the lifecycle signal, whichever comes first.
/// Manual refreshes do not reset the timer.
async fn run<T>(
    cache: Weak<Shared<T>>,
    period: Duration,
    lifecycle: CancellationToken,
    name: String,
)
where
    T: Send + Sync + 'static,
{
    debug!(
        component = "recached",
        event = "loop_started",
        cache = %name,
        period_ms = period.as_millis() as u64,
        "refresh loop started"
    );

    loop {
        tokio::select! {
            biased;
            _ = lifecycle.cancelled() => {
                stopped(&name, "cancelled");
                return;
            }
            _ = tokio::time::sleep(period) => {
                let Some(shared) = cache.upgrade() else {
                    stopped(&name, "dropped");
                    return;
                };
                // The producer may block, keep it off the runtime workers.
                if let Err(e) = tokio::task::spawn_blocking(move || shared.update()).await {
                    if e.is_panic() {
                        std::panic::resume_unwind(e.into_panic());
                    }
                    stopped(&name, "runtime_shutdown");
                    return;
                }
            }
        }
    }
}

fn stopped(name: &str, reason: &str) {
    debug!(
        component = "recached",
        event = "loop_stopped",
        cache = %name,
        reason,
        "refresh loop stopped"
    );
}
