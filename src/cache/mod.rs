// Package cache provides the self-refreshing value holder.

pub mod builder;
pub mod recached;
mod updater;


// Re-export main types
pub use builder::Builder;
pub use recached::{Producer, RefreshableCache, State};
