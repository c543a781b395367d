//! Deduplicated logging of refresh failures to prevent log spam.

pub mod log_entry;

pub use log_entry::{err, start_dedup_logger};

pub(crate) const COMPONENT: &str = "dedlog";
