// Scenario tests for the cache lifecycle: running, stopped, refreshed by hand and by fan-out.

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::cache::{RefreshableCache, State};
use crate::registry::Registry;
use crate::tests::support::{wait_until, Counter};

/// Runs automatically, stops on cancel, keeps serving and refreshing by hand.
#[tokio::test]
async fn test_cache_lifecycle() {
    let token = CancellationToken::new();
    let counter = Counter::new();
    let cache = RefreshableCache::builder(Duration::from_millis(20), counter.producer())
        .name("lifecycle")
        .build(token.clone());

    assert_eq!(cache.get(), 1);
    assert_eq!(cache.state(), State::Running);

    assert!(
        wait_until(Duration::from_millis(500), || cache.get() >= 3).await,
        "value was not refreshed automatically, got {}",
        cache.get()
    );

    cache.refresh();
    token.cancel();
    sleep(Duration::from_millis(30)).await;
    let current = cache.get();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.get(), current, "value changed after cancellation");
    assert_eq!(cache.state(), State::Stopped);

    cache.refresh();
    assert_eq!(cache.get(), current + 1);
}

/// Cancelling one cache's signal leaves every other cache running.
#[tokio::test]
async fn test_cancellation_is_scoped_to_one_cache() {
    let stopped_token = CancellationToken::new();
    let running_token = CancellationToken::new();
    let stopped_counter = Counter::new();
    let running_counter = Counter::new();

    let stopped = RefreshableCache::new(
        Duration::from_millis(10),
        stopped_counter.producer(),
        stopped_token.clone(),
    );
    let running = RefreshableCache::new(
        Duration::from_millis(10),
        running_counter.producer(),
        running_token.clone(),
    );

    stopped_token.cancel();
    sleep(Duration::from_millis(20)).await;
    let frozen = stopped.get();
    let before = running.get();

    sleep(Duration::from_millis(80)).await;
    assert_eq!(stopped.get(), frozen);
    assert!(running.get() > before, "sibling cache stopped refreshing");
    assert_eq!(running.state(), State::Running);
    running_token.cancel();
}

/// A stopped cache still takes part in fan-outs.
#[tokio::test]
async fn test_fan_out_reaches_stopped_caches() {
    let registry = Registry::new();
    let token = CancellationToken::new();
    let counter = Counter::new();
    let cache = RefreshableCache::builder(Duration::from_secs(3600), counter.producer())
        .registry(&registry)
        .build(token.clone());

    token.cancel();
    registry.fan_out_refresh().await;

    assert_eq!(cache.state(), State::Stopped);
    assert_eq!(cache.get(), 2);
}

/// Manual refreshes do not push the periodic tick back.
#[tokio::test]
async fn test_manual_refresh_does_not_reset_timer() {
    let token = CancellationToken::new();
    let counter = Counter::new();
    let cache =
        RefreshableCache::new(Duration::from_millis(100), counter.producer(), token.clone());

    // Keep refreshing by hand faster than the period; the tick must still fire.
    let mut manual = 0;
    for _ in 0..15 {
        sleep(Duration::from_millis(10)).await;
        cache.refresh();
        manual += 1;
    }
    assert!(
        wait_until(Duration::from_millis(200), || counter.get() > 1 + manual).await,
        "no periodic refresh among {} manual ones",
        manual
    );
    token.cancel();
}

/// A loop spawned on a runtime dies with it, while the lifecycle signal
/// still reports the cache as running.
#[test]
fn test_refresh_loop_ends_with_its_runtime() {
    let token = CancellationToken::new();
    let counter = Counter::new();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let cache = rt.block_on(async {
        RefreshableCache::new(Duration::from_millis(10), counter.producer(), token.clone())
    });
    std::thread::sleep(Duration::from_millis(60));
    assert!(counter.get() >= 2, "loop never ticked on its runtime");

    rt.shutdown_timeout(Duration::from_secs(1));
    let settled = counter.get();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(counter.get(), settled, "loop outlived its runtime");
    assert_eq!(cache.state(), State::Running);

    cache.refresh();
    assert_eq!(cache.get(), settled + 1, "manual refresh still works");
    token.cancel();
}
