//! Page model registry
//!
//! Maps logical element names to the selectors the automation provider
//! understands. The registry is built once from configuration and offers
//! no way to change it afterwards.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::common::config::SiteConfig;
use crate::common::{Error, Result};

pub const LOGIN_LOGO: &str = "login_logo";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const LOGIN_BUTTON: &str = "login_button";
pub const ERROR: &str = "error";
pub const ERROR_BUTTON: &str = "error_button";
pub const CREDENTIALS_LISTING: &str = "credentials_listing";
pub const INVENTORY_LIST: &str = "inventory_list";
pub const INVENTORY_ITEM: &str = "inventory_item";
pub const ITEM_NAME: &str = "item_name";
pub const ITEM_DESCRIPTION: &str = "item_description";
pub const ITEM_PRICE: &str = "item_price";
pub const ITEM_IMAGE: &str = "item_image";

/// Page an element lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Inventory,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Login => write!(f, "login"),
            Page::Inventory => write!(f, "inventory"),
        }
    }
}

/// Built-in element metadata
#[derive(Debug, Clone)]
pub struct ElementInfo {
    /// Logical name used by scenarios
    pub name: &'static str,
    /// Default CSS selector
    pub selector: &'static str,
    pub page: Page,
    pub description: &'static str,
}

/// Elements of the storefront known out of the box
static DEFAULT_ELEMENTS: &[ElementInfo] = &[
    ElementInfo {
        name: LOGIN_LOGO,
        selector: ".login_logo",
        page: Page::Login,
        description: "Site logo above the login form",
    },
    ElementInfo {
        name: USERNAME,
        selector: "[data-test=\"username\"]",
        page: Page::Login,
        description: "Username input",
    },
    ElementInfo {
        name: PASSWORD,
        selector: "[data-test=\"password\"]",
        page: Page::Login,
        description: "Password input",
    },
    ElementInfo {
        name: LOGIN_BUTTON,
        selector: "[data-test=\"login-button\"]",
        page: Page::Login,
        description: "Login submit button",
    },
    ElementInfo {
        name: ERROR,
        selector: "[data-test=\"error\"]",
        page: Page::Login,
        description: "Error indicator shown after a rejected login",
    },
    ElementInfo {
        name: ERROR_BUTTON,
        selector: ".error-button",
        page: Page::Login,
        description: "Control that dismisses the error indicator",
    },
    ElementInfo {
        name: CREDENTIALS_LISTING,
        selector: "#login_credentials",
        page: Page::Login,
        description: "Listing of accepted demo usernames",
    },
    ElementInfo {
        name: INVENTORY_LIST,
        selector: ".inventory_list",
        page: Page::Inventory,
        description: "Product list container",
    },
    ElementInfo {
        name: INVENTORY_ITEM,
        selector: ".inventory_item",
        page: Page::Inventory,
        description: "One product card",
    },
    ElementInfo {
        name: ITEM_NAME,
        selector: ".inventory_item_name",
        page: Page::Inventory,
        description: "Product name within a card",
    },
    ElementInfo {
        name: ITEM_DESCRIPTION,
        selector: ".inventory_item_desc",
        page: Page::Inventory,
        description: "Product description within a card",
    },
    ElementInfo {
        name: ITEM_PRICE,
        selector: ".inventory_item_price",
        page: Page::Inventory,
        description: "Product price within a card",
    },
    ElementInfo {
        name: ITEM_IMAGE,
        selector: ".inventory_item_img img",
        page: Page::Inventory,
        description: "Product image within a card",
    },
];

/// Get all built-in elements
pub fn default_elements() -> &'static [ElementInfo] {
    DEFAULT_ELEMENTS
}

/// Get built-in element info by logical name
pub fn get_element(name: &str) -> Option<&'static ElementInfo> {
    DEFAULT_ELEMENTS.iter().find(|e| e.name == name)
}

/// A logical element name bound to an opaque selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub logical_name: String,
    pub selector: String,
}

impl Locator {
    pub fn new(logical_name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            selector: selector.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.logical_name, self.selector)
    }
}

/// Immutable element map plus the canonical page URLs
#[derive(Debug, Clone)]
pub struct PageRegistry {
    locators: Vec<Locator>,
    index: HashMap<String, usize>,
    entry_url: String,
    inventory_url: String,
}

impl PageRegistry {
    /// Build a registry, rejecting duplicate logical names
    pub fn new(
        locators: Vec<Locator>,
        entry_url: impl Into<String>,
        inventory_url: impl Into<String>,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(locators.len());
        for (i, locator) in locators.iter().enumerate() {
            if index.insert(locator.logical_name.clone(), i).is_some() {
                return Err(Error::Config(format!(
                    "Element '{}' registered twice",
                    locator.logical_name
                )));
            }
        }

        Ok(Self {
            locators,
            index,
            entry_url: entry_url.into(),
            inventory_url: inventory_url.into(),
        })
    }

    /// Built-in elements with the site's selector overrides applied
    ///
    /// Override names that are not built in register additional elements.
    pub fn from_site(site: &SiteConfig) -> Result<Self> {
        let mut locators: Vec<Locator> = DEFAULT_ELEMENTS
            .iter()
            .map(|e| {
                let selector = site
                    .elements
                    .get(e.name)
                    .map(String::as_str)
                    .unwrap_or(e.selector);
                Locator::new(e.name, selector)
            })
            .collect();

        for (name, selector) in &site.elements {
            if get_element(name).is_none() {
                if selector.trim().is_empty() {
                    return Err(Error::Config(format!("Element '{}' has an empty selector", name)));
                }
                locators.push(Locator::new(name.as_str(), selector.as_str()));
            }
        }

        Self::new(locators, site.entry_url.as_str(), site.inventory_url.as_str())
    }

    /// Resolve a logical element name
    pub fn resolve(&self, logical_name: &str) -> Result<&Locator> {
        self.index
            .get(logical_name)
            .map(|&i| &self.locators[i])
            .ok_or_else(|| Error::UnknownElement(logical_name.to_string()))
    }

    /// All registered locators, in registration order
    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }

    pub fn inventory_url(&self) -> &str {
        &self.inventory_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_resolves_all_builtins() {
        let registry = PageRegistry::from_site(&SiteConfig::default()).unwrap();
        for element in default_elements() {
            let locator = registry.resolve(element.name).unwrap();
            assert_eq!(locator.selector, element.selector);
        }
        assert_eq!(registry.inventory_url(), "https://www.saucedemo.com/inventory.html");
    }

    #[test]
    fn test_unknown_element() {
        let registry = PageRegistry::from_site(&SiteConfig::default()).unwrap();
        let err = registry.resolve("checkout_button").unwrap_err();
        assert!(matches!(err, Error::UnknownElement(name) if name == "checkout_button"));
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut site = SiteConfig::default();
        site.elements.insert(LOGIN_BUTTON.into(), "#login-button".into());
        site.elements.insert("cart_badge".into(), ".shopping_cart_badge".into());
        let registry = PageRegistry::from_site(&site).unwrap();
        assert_eq!(registry.resolve(LOGIN_BUTTON).unwrap().selector, "#login-button");
        assert_eq!(registry.resolve("cart_badge").unwrap().selector, ".shopping_cart_badge");
        assert_eq!(registry.locators().len(), default_elements().len() + 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = PageRegistry::new(
            vec![Locator::new("a", ".a"), Locator::new("a", ".b")],
            "http://x/",
            "http://x/inv",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
