// Fan-out over the process-wide registry. Kept in its own binary so no other
// test's caches are refreshed by it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use recache::{registry, RefreshableCache};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_global_fan_out_refresh() {
    let token = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let before = registry::global().len();

    let caches: Vec<_> = (0..10)
        .map(|_| {
            let calls = calls.clone();
            RefreshableCache::new(
                Duration::from_secs(3600),
                move || Ok(calls.fetch_add(1, Ordering::SeqCst) + 1),
                token.clone(),
            )
        })
        .collect();
    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert_eq!(registry::global().len(), before + 10);

    registry::fan_out_refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 20);

    // Dropped caches leave the registry and are no longer refreshed.
    drop(caches);
    assert_eq!(registry::global().len(), before);
    registry::fan_out_refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 20);
    token.cancel();
}
