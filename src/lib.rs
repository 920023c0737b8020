//! Storefront E2E - browser end-to-end checks for the Swag Labs demo store
//!
//! Drives a browser through the login and inventory pages over WebDriver,
//! compares what it sees against fixture data, and reports per-scenario
//! verdicts.

pub mod assertions;
pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod fixtures;
pub mod pages;
pub mod report;
pub mod suite;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::{Browser, SimulatedStore};
pub use report::{Report, Summary};
