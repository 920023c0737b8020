//! CLI command handling
//!
//! Applies command-line overrides to the configuration, wires the
//! components together and formats output.

use std::path::PathBuf;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::driver::{self, Browser};
use crate::fixtures::{load_products, FixtureStore, ProductRecord};
use crate::pages::{self, PageRegistry};
use crate::report::Report;
use crate::suite::{self, SuiteOptions};
use crate::testing::{load_scenario, run_scenario, Runner, TestScenario};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Run {
            fixtures,
            driver,
            webdriver_url,
            browser,
            headed,
            credentials,
            only,
            scenarios,
            json,
            verbose,
        } => {
            if let Some(dir) = fixtures {
                config.fixtures.dir = dir;
            }
            if let Some(kind) = driver {
                config.driver.kind = kind.into();
            }
            if let Some(url) = webdriver_url {
                config.driver.webdriver_url = url;
            }
            if let Some(browser) = browser {
                config.driver.browser = browser.into();
            }
            if headed {
                config.driver.headless = false;
            }
            if let Some(source) = credentials {
                config.fixtures.credentials = source.into();
            }

            let opts = SuiteOptions { only, verbose };
            run(&config, &scenarios, &opts, json).await
        }

        Commands::Fixtures { fixtures, json } => {
            if let Some(dir) = fixtures {
                config.fixtures.dir = dir;
            }
            let store = FixtureStore::load(&config.fixtures)?;
            print_fixtures(&store, json)
        }

        Commands::Elements { json } => {
            let registry = PageRegistry::from_site(&config.site)?;
            print_elements(&registry, json)
        }
    }
}

async fn run(config: &Config, scenarios: &[PathBuf], opts: &SuiteOptions, json: bool) -> Result<()> {
    let registry = PageRegistry::from_site(&config.site)?;
    let products = load_products(&config.fixtures.products_path())?;
    // Bad scenario files fail before a browser is started
    let scenarios = scenarios
        .iter()
        .map(|path| load_scenario(path))
        .collect::<Result<Vec<_>>>()?;

    let mut browser = driver::connect(config, &registry, &products).await?;
    let outcome = drive(browser.as_mut(), &registry, config, products, &scenarios, opts, json).await;

    // Cleanup: end the browser session whatever happened
    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    let report = outcome?;
    if json {
        println!("{}", report.to_json()?);
    } else {
        report.print(opts.verbose);
    }

    let summary = report.summarize();
    if summary.success() {
        Ok(())
    } else {
        Err(Error::SuiteFailed {
            failed: summary.failed,
            total: summary.total,
        })
    }
}

async fn drive(
    browser: &mut dyn Browser,
    registry: &PageRegistry,
    config: &Config,
    products: Vec<ProductRecord>,
    scenarios: &[TestScenario],
    opts: &SuiteOptions,
    json: bool,
) -> Result<Report> {
    let mut runner = Runner::new(browser, registry, &config.timeouts);

    if !scenarios.is_empty() {
        let mut report = Report::new();
        for scenario in scenarios {
            report.record(run_scenario(&mut runner, scenario, opts.verbose, json).await?);
        }
        return Ok(report);
    }

    let fixtures = suite::resolve_fixtures(&mut runner, config, products).await?;
    suite::run_suite(&mut runner, &config.site, &fixtures, opts).await
}

fn print_fixtures(store: &FixtureStore, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "credentials": store.credentials(),
            "products": store.products(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Credentials:");
    for user in store.credentials() {
        println!("  {:28} {}", user.username, user.persona);
    }
    println!();
    println!("Products:");
    for (i, product) in store.products().iter().enumerate() {
        println!("  {}. {} ({})", i + 1, product.name, product.price);
        println!("     {}", product.image_src);
    }
    Ok(())
}

fn print_elements(registry: &PageRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(registry.locators())?);
        return Ok(());
    }

    println!("Entry page:     {}", registry.entry_url());
    println!("Inventory page: {}", registry.inventory_url());
    println!();
    println!("Elements:");
    for locator in registry.locators() {
        let note = pages::get_element(&locator.logical_name)
            .map(|info| format!("{} page: {}", info.page, info.description))
            .unwrap_or_else(|| "(configured)".to_string());
        println!("  {:20} {:32} {}", locator.logical_name, locator.selector, note);
    }
    Ok(())
}
