//! Scenario tests for caches and the registry working together.

mod cases_lifecycle_test;

pub mod support;
