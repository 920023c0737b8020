//! Scenario and step definitions
//!
//! Steps are built programmatically by the suite, or deserialized from
//! YAML scenario files for ad-hoc flows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};
use crate::fixtures::Persona;

/// A test scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Persona the scenario runs as, for reporting
    pub persona: Option<Persona>,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
    /// Checks applied to the recorded observations
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

/// A single interaction with the application under test
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL
    Navigate { url: String },
    /// Send keystrokes to an element
    Type { element: String, text: String },
    /// Click an element
    Click { element: String },
    /// Record the trimmed text of an element
    ReadText { element: String },
    /// Record an attribute of an element
    ReadAttribute { element: String, attribute: String },
    /// Record whether an element appears within a bounded wait
    Probe {
        element: String,
        /// Wait in milliseconds (default: the configured probe timeout)
        timeout_ms: Option<u64>,
    },
    /// Record whether an element is still present after a bounded wait
    /// for it to disappear
    AwaitAbsent {
        element: String,
        timeout_ms: Option<u64>,
    },
    /// Record the current location
    ReadUrl,
    /// Record name, description, price and image of every item in a list
    ReadItems { container: String, item: String },
}

impl Step {
    /// Key the step's observation is recorded under, if it observes anything
    pub fn observation_key(&self) -> Option<String> {
        match self {
            Step::Navigate { .. } | Step::Type { .. } | Step::Click { .. } => None,
            Step::ReadText { element } => Some(format!("text:{}", element)),
            Step::ReadAttribute { element, attribute } => {
                Some(format!("attr:{}:{}", element, attribute))
            }
            Step::Probe { element, .. } | Step::AwaitAbsent { element, .. } => {
                Some(format!("present:{}", element))
            }
            Step::ReadUrl => Some("url".to_string()),
            Step::ReadItems { item, .. } => Some(format!("items:{}", item)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate {}", url),
            Step::Type { element, text } => write!(f, "type {:?} into {}", text, element),
            Step::Click { element } => write!(f, "click {}", element),
            Step::ReadText { element } => write!(f, "read text of {}", element),
            Step::ReadAttribute { element, attribute } => {
                write!(f, "read {} of {}", attribute, element)
            }
            Step::Probe { element, .. } => write!(f, "probe {}", element),
            Step::AwaitAbsent { element, .. } => write!(f, "await {} gone", element),
            Step::ReadUrl => write!(f, "read url"),
            Step::ReadItems { container, item } => write!(f, "read {} in {}", item, container),
        }
    }
}

/// Expected value of one recorded observation
#[derive(Deserialize, Debug, Clone)]
pub struct Expectation {
    /// Observation key, e.g. "url" or "text:error"
    pub key: String,
    /// Exact expected value
    pub equals: Option<String>,
    /// Expected substring
    pub contains: Option<String>,
    /// Expected presence, for probe observations
    pub present: Option<bool>,
    /// Expected number of items, for item observations
    pub count: Option<usize>,
}

/// Load and parse a YAML scenario file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    let scenario: TestScenario = serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))?;

    if scenario.steps.is_empty() {
        return Err(Error::Config(format!(
            "Test scenario '{}' has no steps",
            scenario.name
        )));
    }
    Ok(scenario)
}
