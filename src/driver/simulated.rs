//! Simulated storefront
//!
//! An in-process model of the demo store that implements [`Browser`]
//! without a real browser. It renders the login page and the inventory
//! page from the site configuration and a product catalog, and reproduces
//! the persona defects the suite checks for (locked-out login, broken
//! product images). Used for offline runs and for the crate's own tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::common::config::SiteConfig;
use crate::common::{Error, Result};
use crate::fixtures::ProductRecord;
use crate::pages::{self, PageRegistry};

use super::{Browser, ElementHandle};

/// Usernames the simulated store accepts
pub const DEMO_USERS: &[&str] = &[
    "standard_user",
    "locked_out_user",
    "problem_user",
    "performance_glitch_user",
    "error_user",
    "visual_user",
];

const LISTING_HEADING: &str = "Accepted usernames are:";
const MISMATCH_MESSAGE: &str =
    "Epic sadface: Username and password do not match any user in this service";
const USERNAME_REQUIRED: &str = "Epic sadface: Username is required";
const PASSWORD_REQUIRED: &str = "Epic sadface: Password is required";

#[derive(Debug, Clone, Default)]
struct Node {
    selectors: Vec<String>,
    text: String,
    attrs: HashMap<String, String>,
    props: HashMap<String, String>,
    children: Vec<usize>,
}

/// Resolved selectors for every element the store renders
#[derive(Debug, Clone)]
struct Selectors {
    logo: String,
    username: String,
    password: String,
    login_button: String,
    error: String,
    error_button: String,
    listing: String,
    list: String,
    item: String,
    name: String,
    description: String,
    price: String,
    image: String,
}

impl Selectors {
    fn resolve(registry: &PageRegistry) -> Result<Self> {
        let get = |name: &str| registry.resolve(name).map(|l| l.selector.clone());
        Ok(Self {
            logo: get(pages::LOGIN_LOGO)?,
            username: get(pages::USERNAME)?,
            password: get(pages::PASSWORD)?,
            login_button: get(pages::LOGIN_BUTTON)?,
            error: get(pages::ERROR)?,
            error_button: get(pages::ERROR_BUTTON)?,
            listing: get(pages::CREDENTIALS_LISTING)?,
            list: get(pages::INVENTORY_LIST)?,
            item: get(pages::INVENTORY_ITEM)?,
            name: get(pages::ITEM_NAME)?,
            description: get(pages::ITEM_DESCRIPTION)?,
            price: get(pages::ITEM_PRICE)?,
            image: get(pages::ITEM_IMAGE)?,
        })
    }
}

/// In-process storefront session
pub struct SimulatedStore {
    site: SiteConfig,
    sel: Selectors,
    catalog: Vec<ProductRecord>,
    users: Vec<String>,
    hidden: HashSet<String>,
    url: String,
    session_user: Option<String>,
    username_input: String,
    password_input: String,
    error: Option<String>,
    nodes: Vec<Node>,
    generation: u64,
}

impl SimulatedStore {
    /// Create a store rendering `catalog` with the demo users
    pub fn new(site: &SiteConfig, registry: &PageRegistry, catalog: Vec<ProductRecord>) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            sel: Selectors::resolve(registry)?,
            catalog,
            users: DEMO_USERS.iter().map(|u| u.to_string()).collect(),
            hidden: HashSet::new(),
            url: "about:blank".to_string(),
            session_user: None,
            username_input: String::new(),
            password_input: String::new(),
            error: None,
            nodes: Vec::new(),
            generation: 0,
        })
    }

    /// Replace the accepted usernames
    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Stop rendering elements carrying `selector`, simulating a broken page
    pub fn hide(&mut self, selector: &str) {
        self.hidden.insert(selector.to_string());
        self.render();
    }

    /// Username of the logged-in session, if any
    pub fn session_user(&self) -> Option<&str> {
        self.session_user.as_deref()
    }

    fn is_entry(&self, url: &str) -> bool {
        url == self.site.entry_url
    }

    fn is_inventory(&self, url: &str) -> bool {
        url == self.site.inventory_url
    }

    fn push(&mut self, parent: Option<usize>, selectors: &[&str], text: &str) -> Option<usize> {
        if selectors.iter().any(|s| self.hidden.contains(*s)) {
            return None;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            text: text.to_string(),
            ..Default::default()
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        Some(index)
    }

    fn set_attrs(&mut self, node: Option<usize>, attrs: &[(&str, &str)]) {
        if let Some(node) = node {
            for (k, v) in attrs {
                self.nodes[node].attrs.insert(k.to_string(), v.to_string());
            }
        }
    }

    fn render(&mut self) {
        self.nodes.clear();
        self.generation += 1;

        let url = self.url.clone();
        if self.is_entry(&url) {
            self.render_login();
        } else if self.is_inventory(&url) && self.session_user.is_some() {
            self.render_inventory();
        }
    }

    fn render_login(&mut self) {
        let sel = self.sel.clone();

        let logo = self.site.logo_title.clone();
        self.push(None, &[sel.logo.as_str()], &logo);

        let username = self.push(None, &[sel.username.as_str()], "");
        self.set_attrs(username, &[("placeholder", "Username"), ("type", "text")]);

        let password = self.push(None, &[sel.password.as_str()], "");
        self.set_attrs(password, &[("placeholder", "Password"), ("type", "password")]);

        let button = self.push(None, &[sel.login_button.as_str()], "");
        self.set_attrs(button, &[("value", "Login"), ("type", "submit")]);

        if let Some(message) = self.error.clone() {
            let error = self.push(None, &[sel.error.as_str()], &message);
            if error.is_some() {
                self.push(error, &[sel.error_button.as_str()], "");
            }
        }

        let text = std::iter::once(LISTING_HEADING.to_string())
            .chain(self.users.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n");
        let html = format!(
            "<h4>{}</h4>{}",
            LISTING_HEADING,
            self.users.iter().map(|u| format!("{}<br>", u)).collect::<String>()
        );
        if let Some(listing) = self.push(None, &[sel.listing.as_str()], &text) {
            self.nodes[listing].props.insert("innerHTML".to_string(), html);
        }
    }

    fn render_inventory(&mut self) {
        let sel = self.sel.clone();
        let Some(list) = self.push(None, &[sel.list.as_str()], "") else {
            return;
        };

        for product in self.catalog.clone() {
            let Some(item) = self.push(Some(list), &[sel.item.as_str()], "") else {
                continue;
            };
            self.push(Some(item), &[sel.name.as_str()], &product.name);
            self.push(Some(item), &[sel.description.as_str()], &product.description);
            self.push(Some(item), &[sel.price.as_str()], &product.price);
            let src = self.image_for(&product);
            let image = self.push(Some(item), &[sel.image.as_str()], "");
            self.set_attrs(image, &[("src", src.as_str()), ("alt", product.name.as_str())]);
        }
    }

    /// Image the current user sees for a product
    fn image_for(&self, product: &ProductRecord) -> String {
        match self.session_user.as_deref() {
            Some("problem_user") => self.site.broken_image.clone(),
            Some("visual_user") if product.name == self.site.visual_defect_item => {
                self.site.broken_image.clone()
            }
            _ => product.image_src.clone(),
        }
    }

    fn submit_login(&mut self) {
        let username = std::mem::take(&mut self.username_input);
        let password = std::mem::take(&mut self.password_input);

        let error = if username.is_empty() {
            Some(USERNAME_REQUIRED.to_string())
        } else if password.is_empty() {
            Some(PASSWORD_REQUIRED.to_string())
        } else if !self.users.contains(&username) || password != self.site.password {
            Some(MISMATCH_MESSAGE.to_string())
        } else if username == "locked_out_user" {
            Some(self.site.locked_out_message.clone())
        } else {
            None
        };

        match error {
            Some(message) => {
                tracing::debug!(%username, "Simulated login rejected");
                self.error = Some(message);
            }
            None => {
                tracing::debug!(%username, "Simulated login accepted");
                self.error = None;
                self.session_user = Some(username);
                self.url = self.site.inventory_url.clone();
            }
        }
        self.render();
    }

    fn handle(&self, index: usize) -> ElementHandle {
        ElementHandle(format!("sim-{}-{}", self.generation, index))
    }

    fn node_index(&self, handle: &ElementHandle) -> Result<usize> {
        let stale = || Error::ElementNotFound(format!("stale element reference {}", handle));
        let mut parts = handle.0.strip_prefix("sim-").ok_or_else(stale)?.splitn(2, '-');
        let generation: u64 = parts.next().and_then(|g| g.parse().ok()).ok_or_else(stale)?;
        let index: usize = parts.next().and_then(|i| i.parse().ok()).ok_or_else(stale)?;
        if generation != self.generation || index >= self.nodes.len() {
            return Err(stale());
        }
        Ok(index)
    }

    fn matches(&self, index: usize, selector: &str) -> bool {
        self.nodes[index].selectors.iter().any(|s| s == selector)
    }

    fn descendants(&self, index: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[index].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn rendered_text(&self, index: usize) -> String {
        let node = &self.nodes[index];
        let mut parts = Vec::new();
        if !node.text.is_empty() {
            parts.push(node.text.clone());
        }
        for &child in &node.children {
            let text = self.rendered_text(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }
}

#[async_trait]
impl Browser for SimulatedStore {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if self.is_entry(url) {
            self.url = url.to_string();
            self.username_input.clear();
            self.password_input.clear();
            self.error = None;
        } else if self.is_inventory(url) {
            if self.session_user.is_some() {
                self.url = url.to_string();
            } else {
                self.url = self.site.entry_url.clone();
                self.error = Some(self.site.access_message.clone());
            }
        } else {
            return Err(Error::Driver(format!(
                "unknown error: net::ERR_NAME_NOT_RESOLVED ({})",
                url
            )));
        }
        self.render();
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn find_element(&mut self, selector: &str) -> Result<ElementHandle> {
        (0..self.nodes.len())
            .find(|&i| self.matches(i, selector))
            .map(|i| self.handle(i))
            .ok_or_else(|| Error::ElementNotFound(selector.to_string()))
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementHandle>> {
        Ok((0..self.nodes.len())
            .filter(|&i| self.matches(i, selector))
            .map(|i| self.handle(i))
            .collect())
    }

    async fn find_child(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<ElementHandle> {
        self.find_children(parent, selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(selector.to_string()))
    }

    async fn find_children(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        let parent = self.node_index(parent)?;
        let mut all = Vec::new();
        self.descendants(parent, &mut all);
        Ok(all
            .into_iter()
            .filter(|&i| self.matches(i, selector))
            .map(|i| self.handle(i))
            .collect())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<()> {
        let index = self.node_index(element)?;
        let (username, password) = (self.sel.username.clone(), self.sel.password.clone());
        if self.matches(index, &username) {
            self.username_input.push_str(text);
        } else if self.matches(index, &password) {
            self.password_input.push_str(text);
        } else {
            return Err(Error::Driver(format!("element not interactable: {}", element)));
        }
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let index = self.node_index(element)?;
        let (login, dismiss) = (self.sel.login_button.clone(), self.sel.error_button.clone());
        if self.matches(index, &login) {
            self.submit_login();
        } else if self.matches(index, &dismiss) {
            self.error = None;
            self.render();
        }
        Ok(())
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String> {
        let index = self.node_index(element)?;
        Ok(self.rendered_text(index))
    }

    async fn attribute(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let index = self.node_index(element)?;
        Ok(self.nodes[index].attrs.get(name).cloned())
    }

    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let index = self.node_index(element)?;
        Ok(self.nodes[index].props.get(name).cloned())
    }

    async fn clear_session(&mut self) -> Result<()> {
        self.session_user = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.session_user = None;
        self.error = None;
        self.url = "about:blank".to_string();
        self.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (SimulatedStore, PageRegistry) {
        let site = SiteConfig::default();
        let registry = PageRegistry::from_site(&site).unwrap();
        let catalog = vec![
            ProductRecord {
                name: "Sauce Labs Backpack".into(),
                description: "bag".into(),
                price: "$29.99".into(),
                image_src: "/backpack.jpg".into(),
            },
            ProductRecord {
                name: "Sauce Labs Onesie".into(),
                description: "onesie".into(),
                price: "$7.99".into(),
                image_src: "/onesie.jpg".into(),
            },
        ];
        let store = SimulatedStore::new(&site, &registry, catalog).unwrap();
        (store, registry)
    }

    async fn login(store: &mut SimulatedStore, registry: &PageRegistry, user: &str) {
        let site = SiteConfig::default();
        store.navigate(&site.entry_url).await.unwrap();
        let u = store.find_element(&registry.resolve(pages::USERNAME).unwrap().selector).await.unwrap();
        store.type_text(&u, user).await.unwrap();
        let p = store.find_element(&registry.resolve(pages::PASSWORD).unwrap().selector).await.unwrap();
        store.type_text(&p, &site.password).await.unwrap();
        let b = store
            .find_element(&registry.resolve(pages::LOGIN_BUTTON).unwrap().selector)
            .await
            .unwrap();
        store.click(&b).await.unwrap();
    }

    #[tokio::test]
    async fn test_standard_login_lands_on_inventory() {
        let (mut store, registry) = store();
        login(&mut store, &registry, "standard_user").await;
        assert_eq!(store.current_url().await.unwrap(), SiteConfig::default().inventory_url);
        let items = store.find_elements(".inventory_item").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_locked_out_sees_error() {
        let (mut store, registry) = store();
        login(&mut store, &registry, "locked_out_user").await;
        let error = store.find_element("[data-test=\"error\"]").await.unwrap();
        let text = store.text(&error).await.unwrap();
        assert!(text.contains("locked out"));
        assert!(store.session_user().is_none());
    }

    #[tokio::test]
    async fn test_visual_user_breaks_only_backpack() {
        let (mut store, registry) = store();
        login(&mut store, &registry, "visual_user").await;
        let images = store.find_elements(".inventory_item_img img").await.unwrap();
        let first = store.attribute(&images[0], "src").await.unwrap().unwrap();
        let second = store.attribute(&images[1], "src").await.unwrap().unwrap();
        assert_eq!(first, SiteConfig::default().broken_image);
        assert_eq!(second, "/onesie.jpg");
    }

    #[tokio::test]
    async fn test_handles_go_stale_after_navigation() {
        let (mut store, _) = store();
        store.navigate(&SiteConfig::default().entry_url).await.unwrap();
        let logo = store.find_element(".login_logo").await.unwrap();
        store.navigate(&SiteConfig::default().entry_url).await.unwrap();
        assert!(matches!(store.text(&logo).await, Err(Error::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_url_is_driver_error() {
        let (mut store, _) = store();
        let err = store.navigate("https://elsewhere.example/").await.unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
    }

    #[tokio::test]
    async fn test_hidden_elements_are_not_rendered() {
        let (mut store, _) = store();
        store.hide(".login_logo");
        store.navigate(&SiteConfig::default().entry_url).await.unwrap();
        assert!(store.find_element(".login_logo").await.is_err());
    }
}
