use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::dedlog::COMPONENT;
use crate::error::Error;

/// Log entry for deduplication
#[derive(Debug, Clone)]
pub struct LogEntry {
    cache: String,
    reason: &'static str,
    err: String,
    count: usize,
}

impl LogEntry {
    fn new(cache: &str, err: &Error) -> Self {
        Self {
            cache: cache.to_string(),
            reason: err.reason(),
            err: err.to_string(),
            count: 1,
        }
    }

    fn key(&self) -> String {
        format!("{}/{}", self.cache, self.reason)
    }
}

// Global channel for sending log entries, set when start_dedup_logger is called.
// Uses std::sync::Mutex with try_lock so the refresh path never waits on it.
static ERR_CH: once_cell::sync::Lazy<Mutex<Option<mpsc::Sender<LogEntry>>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(None));

fn get_err_ch() -> Option<mpsc::Sender<LogEntry>> {
    if let Ok(guard) = ERR_CH.try_lock() {
        guard.clone()
    } else {
        None
    }
}

fn set_err_ch(tx: Option<mpsc::Sender<LogEntry>>) {
    if let Ok(mut guard) = ERR_CH.lock() {
        *guard = tx;
    }
}

/// Reports a refresh failure of the named cache.
/// Non-blocking; a no-op while the dedup logger is not running.
pub fn err(cache: &str, err: &Error) {
    if let Some(tx) = get_err_ch() {
        let _ = tx.try_send(LogEntry::new(cache, err));
    }
}

/// Merges an entry into the current window, keeping the latest error text.
fn record(window: &DashMap<String, LogEntry>, entry: LogEntry) {
    match window.entry(entry.key()) {
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            existing.count += 1;
            existing.err = entry.err;
        }
        Entry::Vacant(slot) => {
            slot.insert(entry);
        }
    }
}

/// Empties the window, returning its entries ordered by key.
fn drain(window: &DashMap<String, LogEntry>) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = window.iter().map(|e| e.value().clone()).collect();
    window.clear();
    entries.sort_by_key(|e| e.key());
    entries
}

fn flush(window: &DashMap<String, LogEntry>) {
    for entry in drain(window) {
        warn!(
            component = COMPONENT,
            cache = %entry.cache,
            count = entry.count,
            err = %entry.err,
            "{}", entry.reason
        );
    }
}

/// Runs the deduplicated logger until `ctx` is cancelled.
/// Each `every` window emits one line per cache and failure reason.
pub async fn start_dedup_logger(ctx: CancellationToken, every: Duration) {
    let (tx, mut rx) = mpsc::channel(1024);
    set_err_ch(Some(tx));
    let window: DashMap<String, LogEntry> = DashMap::new();

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                break;
            }
            entry = rx.recv() => {
                match entry {
                    Some(entry) => record(&window, entry),
                    None => break,
                }
            }
            _ = interval.tick() => {
                flush(&window);
            }
        }
    }

    rx.close();
    while let Ok(entry) = rx.try_recv() {
        record(&window, entry);
    }
    flush(&window);
    set_err_ch(None);
}
