//! Metrics for refresh activity.
//
//! Everything goes through the `metrics` facade; installing a recorder
//! (Prometheus exporter or otherwise) is left to the host application.

pub mod meter;

// Re-export commonly used items
pub use meter::*;
