//! Error types for the storefront harness
//!
//! Fixture and registry errors are fatal to a run. Step and assertion
//! errors are scoped to a single scenario and end up in its result instead
//! of being raised to the caller.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Fixture Errors ===
    #[error("Fixture not found: {path}. Pass --fixtures <dir> or set [fixtures] in config.toml")]
    FixtureMissing { path: String },

    #[error("Malformed fixture '{path}': {reason}")]
    FixtureMalformed { path: String, reason: String },

    // === Page Model Errors ===
    #[error("Unknown element '{0}'. Run 'storefront-e2e elements' to list registered names")]
    UnknownElement(String),

    // === Automation Provider Errors ===
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("Browser driver error: {0}")]
    Driver(String),

    // === Scenario Errors ===
    #[error("Step {index} ({step}) failed: {reason}")]
    StepFailed {
        index: usize,
        step: String,
        reason: String,
    },

    #[error("Assertion mismatch on {field}: expected '{expected}', observed '{observed}'")]
    AssertionMismatch {
        field: String,
        expected: String,
        observed: String,
    },

    #[error("{failed} of {total} scenarios failed")]
    SuiteFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a malformed fixture error
    pub fn fixture_malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FixtureMalformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            ms,
        }
    }

    /// Create a step failure error
    pub fn step_failed(index: usize, step: &str, reason: &str) -> Self {
        Self::StepFailed {
            index,
            step: step.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than one scenario
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FixtureMissing { .. }
                | Error::FixtureMalformed { .. }
                | Error::UnknownElement(_)
                | Error::Config(_)
                | Error::ConfigParse(_)
        )
    }

    /// Stable machine-readable code, used in JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::FixtureMissing { .. } => "FIXTURE_MISSING",
            Error::FixtureMalformed { .. } => "FIXTURE_MALFORMED",
            Error::UnknownElement(_) => "UNKNOWN_ELEMENT",
            Error::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            Error::Timeout { .. } => "TIMEOUT",
            Error::StepFailed { .. } => "STEP_FAILED",
            Error::AssertionMismatch { .. } => "ASSERTION_MISMATCH",
            Error::SuiteFailed { .. } => "SUITE_FAILED",
            Error::Driver(_) | Error::Http(_) => "DRIVER_ERROR",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::UnknownElement("x".into()).is_fatal());
        assert!(Error::fixture_malformed("a.json", "empty").is_fatal());
        assert!(!Error::ElementNotFound(".x".into()).is_fatal());
        assert!(!Error::timeout(".x", 10).is_fatal());
    }

    #[test]
    fn test_messages_carry_detail() {
        let err = Error::step_failed(3, "click login_button", "element not found");
        assert_eq!(
            err.to_string(),
            "Step 3 (click login_button) failed: element not found"
        );
        assert_eq!(err.code(), "STEP_FAILED");
    }
}
