//! Unit-level tests against the public API

pub mod cohort_properties;
pub mod worked_examples;
