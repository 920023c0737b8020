//! Report sink
//!
//! Collects scenario results in completion order and condenses them into
//! a summary for the terminal or as JSON.

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;
use crate::fixtures::Persona;
use crate::testing::{Outcome, ScenarioResult};

/// Results of one suite run
#[derive(Debug, Default, Clone)]
pub struct Report {
    results: Vec<ScenarioResult>,
}

/// Condensed view of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<FailureDetail>,
}

impl Summary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Why one scenario did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    /// Failing field, or the step a scenario aborted at
    pub field: String,
    pub expected: String,
    pub observed: String,
}

impl FailureDetail {
    fn from_result(result: &ScenarioResult) -> Vec<Self> {
        let detail = |field: String, expected: String, observed: String| FailureDetail {
            scenario: result.name.clone(),
            persona: result.persona,
            field,
            expected,
            observed,
        };

        match &result.outcome {
            Outcome::Passed => Vec::new(),
            Outcome::Failed { discrepancies } => discrepancies
                .iter()
                .map(|d| {
                    let field = match d.item_index {
                        Some(i) => format!("items[{}].{}", i, d.field),
                        None => d.field.clone(),
                    };
                    detail(field, d.expected.clone(), d.observed.clone())
                })
                .collect(),
            Outcome::Aborted {
                step_index,
                step,
                reason,
            } => vec![detail(
                format!("step {} ({})", step_index, step),
                "step completes".to_string(),
                reason.clone(),
            )],
        }
    }
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ScenarioResult) {
        match result.error() {
            Some(err) => tracing::info!(scenario = %result.name, code = err.code(), "{}", err),
            None => tracing::debug!(scenario = %result.name, "Recorded passing result"),
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn summarize(&self) -> Summary {
        let passed = self.results.iter().filter(|r| r.passed()).count();
        Summary {
            total: self.results.len(),
            passed,
            failed: self.results.len() - passed,
            failures: self
                .results
                .iter()
                .flat_map(FailureDetail::from_result)
                .collect(),
        }
    }

    /// Print one line per scenario, then the summary
    pub fn print(&self, verbose: bool) {
        println!("\n{}", "Results:".cyan());
        for result in &self.results {
            let persona = result
                .persona
                .map(|p| format!(" [{}]", p))
                .unwrap_or_default();
            let timing = format!("({} ms)", result.duration_ms).dimmed();
            match &result.outcome {
                Outcome::Passed => {
                    println!("  {} {}{} {}", "✓".green(), result.name, persona, timing)
                }
                Outcome::Failed { discrepancies } => {
                    println!("  {} {}{} {}", "✗".red(), result.name, persona, timing);
                    for d in discrepancies {
                        println!("      {}", d.to_string().red());
                    }
                }
                Outcome::Aborted {
                    step_index,
                    step,
                    reason,
                } => {
                    println!("  {} {}{} {}", "✗".red(), result.name, persona, timing);
                    println!(
                        "      {}",
                        format!("aborted at step {} ({}): {}", step_index, step, reason).red()
                    );
                }
            }

            if verbose {
                for obs in result.observations.iter() {
                    println!(
                        "      {} {} = {}",
                        format!("#{}", obs.step).dimmed(),
                        obs.key.dimmed(),
                        obs.value.describe().dimmed()
                    );
                }
            }
        }

        let summary = self.summarize();
        let line = format!(
            "{} scenarios, {} passed, {} failed",
            summary.total, summary.passed, summary.failed
        );
        if summary.success() {
            println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
        } else {
            println!("\n{} {}\n", "✗".red().bold(), line.red().bold());
        }
    }

    /// Summary plus per-scenario results as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            summary: Summary,
            results: &'a [ScenarioResult],
        }

        Ok(serde_json::to_string_pretty(&JsonReport {
            summary: self.summarize(),
            results: &self.results,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::Discrepancy;
    use crate::testing::Observations;

    fn result(name: &str, outcome: Outcome) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            persona: Some(Persona::Visual),
            username: Some("visual_user".into()),
            steps_executed: 3,
            steps_total: 3,
            observations: Observations::default(),
            outcome,
            duration_ms: 12,
        }
    }

    #[test]
    fn test_summarize_counts_and_details() {
        let mut report = Report::new();
        report.record(result("landing", Outcome::Passed));
        let mut d = Discrepancy::new("image_src", "/a.jpg", "/sl-404.jpg");
        d.item_index = Some(3);
        report.record(result(
            "inventory",
            Outcome::Failed {
                discrepancies: vec![d],
            },
        ));
        report.record(result(
            "login",
            Outcome::Aborted {
                step_index: 2,
                step: "type into username".into(),
                reason: "Timed out".into(),
            },
        ));

        let summary = report.summarize();
        assert_eq!((summary.total, summary.passed, summary.failed), (3, 1, 2));
        assert!(!summary.success());
        assert_eq!(summary.failures[0].field, "items[3].image_src");
        assert_eq!(summary.failures[0].persona, Some(Persona::Visual));
        assert_eq!(summary.failures[1].field, "step 2 (type into username)");
        assert_eq!(summary.failures[1].observed, "Timed out");

        let errors: Vec<_> = report.results().iter().filter_map(|r| r.error()).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code(), "ASSERTION_MISMATCH");
        assert!(errors[0].to_string().contains("items[3].image_src"));
        assert_eq!(
            errors[1].to_string(),
            "Step 2 (type into username) failed: Timed out"
        );
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let mut report = Report::new();
        report.record(result("landing", Outcome::Passed));
        assert_eq!(report.summarize(), report.summarize());
    }

    #[test]
    fn test_empty_report_succeeds() {
        let summary = Report::new().summarize();
        assert_eq!(summary.total, 0);
        assert!(summary.success());
    }

    #[test]
    fn test_json_contains_status_tags() {
        let mut report = Report::new();
        report.record(result("landing", Outcome::Passed));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["passed"], 1);
        assert_eq!(json["results"][0]["outcome"]["status"], "passed");
        assert_eq!(json["results"][0]["persona"], "visual");
    }
}
