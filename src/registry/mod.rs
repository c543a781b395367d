// Package registry keeps non-owning handles to every live cache and refreshes them on demand.

pub mod registry;


// Re-export main types
pub use registry::{fan_out_refresh, fan_out_refresh_blocking, global, Refresher, Registry};
