//! Shared plumbing for the feedback service: configuration, storage paths and
//! helpers used by the test suites of the other crates.

pub mod config;
pub mod paths;
pub mod test_helpers;
