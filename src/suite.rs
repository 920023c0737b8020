//! The storefront suite
//!
//! Builds the fixed scenario list from the fixtures and runs it one
//! scenario at a time on a single browser session:
//!
//! - the landing page renders its login form
//! - every user logs in with the outcome their persona calls for
//! - every user that can log in sees the expected inventory
//! - opening the inventory without a session bounces back to login

use crate::assertions;
use crate::common::config::{Config, CredentialSource, SiteConfig};
use crate::common::Result;
use crate::fixtures::{load_credentials, FixtureStore, ProductRecord, UserCredential};
use crate::pages;
use crate::report::Report;
use crate::testing::{run_login, scrape_credentials, Runner, ScenarioResult, Step};

/// Options for a suite run
#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    /// Only run scenarios whose name contains this string
    pub only: Option<String>,
    /// Print scenario names as they start
    pub verbose: bool,
}

impl SuiteOptions {
    fn selects(&self, name: &str) -> bool {
        self.only.as_deref().map_or(true, |f| name.contains(f))
    }
}

/// Load credentials from the configured source and pair them with the catalog
pub async fn resolve_fixtures(
    runner: &mut Runner<'_>,
    config: &Config,
    products: Vec<ProductRecord>,
) -> Result<FixtureStore> {
    let credentials = match config.fixtures.credentials {
        CredentialSource::File => load_credentials(&config.fixtures.credentials_path())?,
        CredentialSource::Page => scrape_credentials(runner, &config.site).await?,
    };
    FixtureStore::new(credentials, products)
}

/// Run every selected scenario and collect the results
pub async fn run_suite(
    runner: &mut Runner<'_>,
    site: &SiteConfig,
    fixtures: &FixtureStore,
    opts: &SuiteOptions,
) -> Result<Report> {
    let mut report = Report::new();

    let name = "landing page";
    if opts.selects(name) {
        announce(opts, name);
        report.record(landing(runner, site, name).await?);
    }

    for credential in fixtures.credentials() {
        let name = format!("login: {}", credential.username);
        if opts.selects(&name) {
            announce(opts, &name);
            report.record(login(runner, site, credential, &name).await?);
        }
    }

    for credential in fixtures.credentials() {
        if credential.persona.is_locked_out() {
            continue;
        }
        let name = format!("inventory: {}", credential.username);
        if opts.selects(&name) {
            announce(opts, &name);
            report.record(inventory(runner, site, fixtures, credential, &name).await?);
        }
    }

    let name = "unauthenticated access";
    if opts.selects(name) {
        announce(opts, name);
        report.record(unauthenticated(runner, site, name).await?);
    }

    let summary = report.summarize();
    tracing::info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        "Suite finished"
    );
    Ok(report)
}

fn announce(opts: &SuiteOptions, name: &str) {
    if opts.verbose {
        println!("  running {}", name);
    }
}

async fn landing(runner: &mut Runner<'_>, site: &SiteConfig, name: &str) -> Result<ScenarioResult> {
    let read_attr = |element: &str, attribute: &str| Step::ReadAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
    };
    let steps = [
        Step::Navigate {
            url: site.entry_url.clone(),
        },
        Step::ReadText {
            element: pages::LOGIN_LOGO.to_string(),
        },
        read_attr(pages::USERNAME, "placeholder"),
        read_attr(pages::PASSWORD, "placeholder"),
        read_attr(pages::PASSWORD, "type"),
        read_attr(pages::LOGIN_BUTTON, "value"),
    ];

    let exec = runner.run(name, None, &steps).await?;
    let discrepancies = assertions::check_landing(exec.observations(), site);
    exec.finish(discrepancies)
}

async fn login(
    runner: &mut Runner<'_>,
    site: &SiteConfig,
    credential: &UserCredential,
    name: &str,
) -> Result<ScenarioResult> {
    let persona = credential.persona;
    let mut exec = runner
        .start(name, Some(persona), Some(credential.username.as_str()))
        .await?;
    run_login(runner, &mut exec, site, credential, persona.is_locked_out()).await?;

    let discrepancies = assertions::check_login(exec.observations(), persona, site);
    exec.finish(discrepancies)
}

async fn inventory(
    runner: &mut Runner<'_>,
    site: &SiteConfig,
    fixtures: &FixtureStore,
    credential: &UserCredential,
    name: &str,
) -> Result<ScenarioResult> {
    let persona = credential.persona;
    let mut exec = runner
        .start(name, Some(persona), Some(credential.username.as_str()))
        .await?;
    run_login(runner, &mut exec, site, credential, false).await?;

    // Without a successful login there is no inventory to compare
    let login_problems = assertions::check_login(exec.observations(), persona, site);
    if !login_problems.is_empty() {
        return exec.finish(login_problems);
    }

    let read = [Step::ReadItems {
        container: pages::INVENTORY_LIST.to_string(),
        item: pages::INVENTORY_ITEM.to_string(),
    }];
    runner.execute(&mut exec, &read).await?;

    let observed = exec
        .observations()
        .items(pages::INVENTORY_ITEM)
        .unwrap_or_default();
    let discrepancies = assertions::evaluate(observed, fixtures.products(), persona, site);
    exec.finish(discrepancies)
}

async fn unauthenticated(
    runner: &mut Runner<'_>,
    site: &SiteConfig,
    name: &str,
) -> Result<ScenarioResult> {
    let mut exec = runner.start(name, None, None).await?;
    let steps = [
        Step::Navigate {
            url: site.inventory_url.clone(),
        },
        Step::ReadUrl,
        Step::Probe {
            element: pages::ERROR.to_string(),
            timeout_ms: None,
        },
    ];
    runner.execute(&mut exec, &steps).await?;

    if exec.observations().presence(pages::ERROR) == Some(true) {
        let error = [
            Step::ReadText {
                element: pages::ERROR.to_string(),
            },
            Step::Probe {
                element: pages::ERROR_BUTTON.to_string(),
                timeout_ms: None,
            },
        ];
        runner.execute(&mut exec, &error).await?;
    }

    let discrepancies = assertions::check_unauthenticated(exec.observations(), site);
    exec.finish(discrepancies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_filter() {
        let opts = SuiteOptions {
            only: Some("inventory".into()),
            verbose: false,
        };
        assert!(opts.selects("inventory: problem_user"));
        assert!(!opts.selects("login: problem_user"));
        assert!(SuiteOptions::default().selects("landing page"));
    }
}
