//! Browser automation providers
//!
//! The scenario runner only talks to the [`Browser`] trait. Two providers
//! implement it: a W3C WebDriver client for real browsers, and a simulated
//! storefront that needs no browser at all.

pub mod simulated;
pub mod webdriver;

use async_trait::async_trait;
use std::fmt;

use crate::common::config::{Config, DriverKind};
use crate::common::Result;
use crate::fixtures::ProductRecord;
use crate::pages::PageRegistry;

pub use simulated::SimulatedStore;
pub use webdriver::WebDriver;

/// Provider-issued reference to a rendered element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the harness needs from a browser session
///
/// Every call resolves only once the provider reports the effect as
/// complete. Lookups do not wait: an absent element is
/// [`Error::ElementNotFound`](crate::Error::ElementNotFound) immediately,
/// and polling is left to the caller.
#[async_trait]
pub trait Browser: Send {
    /// Load a URL and wait for the page to settle
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current page
    async fn current_url(&mut self) -> Result<String>;

    /// First element matching a selector
    async fn find_element(&mut self, selector: &str) -> Result<ElementHandle>;

    /// All elements matching a selector, in document order
    async fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// First descendant of `parent` matching a selector
    async fn find_child(&mut self, parent: &ElementHandle, selector: &str)
        -> Result<ElementHandle>;

    /// All descendants of `parent` matching a selector
    async fn find_children(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>>;

    /// Send keystrokes to an element
    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<()>;

    async fn click(&mut self, element: &ElementHandle) -> Result<()>;

    /// Rendered text of an element
    async fn text(&mut self, element: &ElementHandle) -> Result<String>;

    /// Markup attribute, `None` when absent
    async fn attribute(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// DOM property such as `innerHTML`, `None` when absent
    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Drop cookies and storage so the next scenario starts logged out
    async fn clear_session(&mut self) -> Result<()>;

    /// End the session
    async fn close(&mut self) -> Result<()>;
}

/// Open a browser session for the configured provider
///
/// The simulated provider renders `catalog` as its inventory.
pub async fn connect(
    config: &Config,
    registry: &PageRegistry,
    catalog: &[ProductRecord],
) -> Result<Box<dyn Browser>> {
    match config.driver.kind {
        DriverKind::Webdriver => {
            let driver = WebDriver::connect(&config.driver, &config.timeouts).await?;
            Ok(Box::new(driver))
        }
        DriverKind::Simulated => {
            tracing::info!("Using simulated storefront");
            Ok(Box::new(SimulatedStore::new(
                &config.site,
                registry,
                catalog.to_vec(),
            )?))
        }
    }
}
