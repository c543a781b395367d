use super::{CacheRule, Config, Logs, RecacheBox, Refresh};
use std::collections::HashMap;
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    let mut caches = HashMap::new();
    caches.insert(
        "test_fast".to_string(),
        CacheRule {
            period: Some(Duration::from_millis(20)),
        },
    );
    caches.insert("test_default".to_string(), CacheRule { period: None });

    Config {
        recache: RecacheBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            refresh: Some(Refresh {
                period: Some(Duration::from_secs(3600)),
                dedup_interval: Some(Duration::from_millis(50)),
            }),
            caches: Some(caches),
        },
    }
}
