// Shared test support code.

pub mod common;

pub use common::*;
