//! CLI command definitions
//!
//! Defines the clap commands for the storefront harness.

use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::common::config::{BrowserKind, CredentialSource, DriverKind};

#[derive(Subcommand)]
pub enum Commands {
    /// Run the storefront suite, or the given YAML scenarios
    Run {
        /// Directory holding credentials.yaml and inventory.json
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Automation provider (default: webdriver)
        #[arg(long, value_enum)]
        driver: Option<DriverArg>,

        /// WebDriver server URL (default: http://localhost:4444)
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Browser to request from the WebDriver server
        #[arg(long, value_enum)]
        browser: Option<BrowserArg>,

        /// Show the browser window instead of running headless
        #[arg(long)]
        headed: bool,

        /// Where usernames come from: the fixture file or the login page
        #[arg(long, value_enum)]
        credentials: Option<CredentialArg>,

        /// Only run scenarios whose name contains this string
        #[arg(long)]
        only: Option<String>,

        /// YAML scenario file(s) to run instead of the built-in suite
        /// Can be specified multiple times: --scenario a.yaml --scenario b.yaml
        #[arg(long = "scenario", short = 's')]
        scenarios: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Load and list the fixture data
    Fixtures {
        /// Directory holding the fixture files
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the registered page elements and their selectors
    Elements {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DriverArg {
    Webdriver,
    Simulated,
}

impl From<DriverArg> for DriverKind {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Webdriver => DriverKind::Webdriver,
            DriverArg::Simulated => DriverKind::Simulated,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

impl From<BrowserArg> for BrowserKind {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chrome => BrowserKind::Chrome,
            BrowserArg::Firefox => BrowserKind::Firefox,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CredentialArg {
    File,
    Page,
}

impl From<CredentialArg> for CredentialSource {
    fn from(arg: CredentialArg) -> Self {
        match arg {
            CredentialArg::File => CredentialSource::File,
            CredentialArg::Page => CredentialSource::Page,
        }
    }
}
