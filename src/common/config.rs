//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Target site URLs, messages and element overrides
    #[serde(default)]
    pub site: SiteConfig,

    /// Automation provider settings
    #[serde(default)]
    pub driver: DriverConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Fixture locations
    #[serde(default)]
    pub fixtures: FixtureConfig,
}

/// Static description of the application under test
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Login (entry) page
    #[serde(default = "default_entry_url")]
    pub entry_url: String,

    /// Protected inventory page
    #[serde(default = "default_inventory_url")]
    pub inventory_url: String,

    /// Password shared by every demo user
    #[serde(default = "default_password")]
    pub password: String,

    /// Text expected in the login page logo
    #[serde(default = "default_logo_title")]
    pub logo_title: String,

    /// Error shown to the locked-out persona
    #[serde(default = "default_locked_out_message")]
    pub locked_out_message: String,

    /// Error shown when the inventory is opened without a session
    #[serde(default = "default_access_message")]
    pub access_message: String,

    /// Image source rendered for a broken product image
    #[serde(default = "default_broken_image")]
    pub broken_image: String,

    /// The only product whose image is broken for the visual persona
    #[serde(default = "default_visual_defect_item")]
    pub visual_defect_item: String,

    /// Selector overrides keyed by logical element name
    #[serde(default)]
    pub elements: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            entry_url: default_entry_url(),
            inventory_url: default_inventory_url(),
            password: default_password(),
            logo_title: default_logo_title(),
            locked_out_message: default_locked_out_message(),
            access_message: default_access_message(),
            broken_image: default_broken_image(),
            visual_defect_item: default_visual_defect_item(),
            elements: BTreeMap::new(),
        }
    }
}

fn default_entry_url() -> String {
    "https://www.saucedemo.com/".to_string()
}
fn default_inventory_url() -> String {
    "https://www.saucedemo.com/inventory.html".to_string()
}
fn default_password() -> String {
    "secret_sauce".to_string()
}
fn default_logo_title() -> String {
    "Swag Labs".to_string()
}
fn default_locked_out_message() -> String {
    "Epic sadface: Sorry, this user has been locked out.".to_string()
}
fn default_access_message() -> String {
    "Epic sadface: You can only access '/inventory.html' when you are logged in.".to_string()
}
fn default_broken_image() -> String {
    "/static/media/sl-404.168b1cce.jpg".to_string()
}
fn default_visual_defect_item() -> String {
    "Sauce Labs Backpack".to_string()
}

/// Which automation provider drives the scenarios
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// W3C WebDriver endpoint (chromedriver, geckodriver, selenium)
    #[default]
    Webdriver,
    /// In-process model of the storefront, no browser required
    Simulated,
}

/// Browser requested from the WebDriver endpoint
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

/// Automation provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DriverConfig {
    #[serde(default)]
    pub kind: DriverKind,

    /// WebDriver server base URL
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub browser: BrowserKind,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::default(),
            webdriver_url: default_webdriver_url(),
            browser: BrowserKind::default(),
            headless: default_headless(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_headless() -> bool {
    true
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// How long to poll for an element before a step fails
    #[serde(default = "default_element_ms")]
    pub element_ms: u64,

    /// Bounded wait used when probing for an optional element
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,

    /// Interval between element lookups
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Per-request timeout for the WebDriver HTTP client
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_ms: default_element_ms(),
            probe_ms: default_probe_ms(),
            poll_ms: default_poll_ms(),
            request_secs: default_request(),
        }
    }
}

fn default_element_ms() -> u64 {
    4_000
}
fn default_probe_ms() -> u64 {
    2_000
}
fn default_poll_ms() -> u64 {
    100
}
fn default_request() -> u64 {
    30
}

/// Where credential data comes from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Versioned YAML fixture file
    #[default]
    File,
    /// Scraped from the credential listing on the login page
    Page,
}

/// Fixture file locations
#[derive(Debug, Deserialize, Clone)]
pub struct FixtureConfig {
    /// Directory holding fixture files; relative names resolve against it
    #[serde(default = "default_fixture_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    #[serde(default = "default_products_file")]
    pub products_file: PathBuf,

    #[serde(default)]
    pub credentials: CredentialSource,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: default_fixture_dir(),
            credentials_file: default_credentials_file(),
            products_file: default_products_file(),
            credentials: CredentialSource::default(),
        }
    }
}

fn default_fixture_dir() -> PathBuf {
    PathBuf::from("fixtures")
}
fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.yaml")
}
fn default_products_file() -> PathBuf {
    PathBuf::from("inventory.json")
}

impl FixtureConfig {
    /// Full path of the credential fixture
    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join(&self.credentials_file)
    }

    /// Full path of the product fixture
    pub fn products_path(&self) -> PathBuf {
        self.dir.join(&self.products_file)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
