// Error definitions shared by the cache, registry and config layers.

/// Errors produced inside the crate.
///
/// `ProducerFailed` never leaves the refresh path: it is logged, counted and
/// dropped, and the cache keeps its last good value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("producer of cache {cache:?} failed: {source}")]
    ProducerFailed {
        cache: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("invalid config: {0}")]
    Config(String),
}

impl Error {
    /// Short, stable reason used as the deduplication key in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::ProducerFailed { .. } => "producer failed",
            Error::Config(_) => "invalid config",
        }
    }
}
