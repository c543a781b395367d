// Metric name constants
pub const REFRESH_UPDATED: &str = "recache_refresh_updated";
pub const REFRESH_ERRORS: &str = "recache_refresh_errors";
pub const FAN_OUTS: &str = "recache_fan_outs";
pub const FAN_OUT_ENTRIES: &str = "recache_fan_out_entries";
pub const REGISTRY_LEN: &str = "recache_registry_len";

const CACHE_LABEL: &str = "cache";

/// Counts a successful refresh of the named cache.
pub fn add_updated(cache: &str) {
    metrics::counter!(REFRESH_UPDATED, CACHE_LABEL => cache.to_string()).increment(1);
}

/// Counts a failed (swallowed) refresh of the named cache.
pub fn add_errors(cache: &str) {
    metrics::counter!(REFRESH_ERRORS, CACHE_LABEL => cache.to_string()).increment(1);
}

/// Counts one fan-out and the number of entries it refreshed.
pub fn add_fan_out(entries: u64) {
    metrics::counter!(FAN_OUTS).increment(1);
    metrics::counter!(FAN_OUT_ENTRIES).increment(entries);
}

/// Sets the number of live registry entries.
pub fn set_registry_len(len: usize) {
    metrics::gauge!(REGISTRY_LEN).set(len as f64);
}
