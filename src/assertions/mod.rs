//! Assertion engine
//!
//! Compares what a scenario observed with what the fixtures and site
//! configuration say should be there. Every check returns the list of
//! field-level discrepancies; an empty list means the check passed.
//!
//! Persona-specific expectations are resolved in one place,
//! [`ImageRule::for_persona`], rather than at each comparison.

use serde::Serialize;
use std::fmt;

use crate::common::config::SiteConfig;
use crate::fixtures::{Persona, ProductRecord};
use crate::pages;
use crate::testing::{Expectation, ObservedItem, Observations};

/// A single field-level mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub field: String,
    pub expected: String,
    pub observed: String,
    /// Position in the inventory, for item fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
}

impl Discrepancy {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            observed: observed.into(),
            item_index: None,
        }
    }

    fn at(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item_index {
            Some(i) => write!(
                f,
                "item {} {}: expected '{}', observed '{}'",
                i, self.field, self.expected, self.observed
            ),
            None => write!(
                f,
                "{}: expected '{}', observed '{}'",
                self.field, self.expected, self.observed
            ),
        }
    }
}

const MISSING: &str = "<missing>";

/// Which image each inventory item is expected to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRule<'a> {
    /// The fixture's image for every item
    Fixture,
    /// The broken-image sentinel for every item
    BrokenAll { sentinel: &'a str },
    /// The sentinel for the named item only, fixture images otherwise
    BrokenOnly { item: &'a str, sentinel: &'a str },
}

impl<'a> ImageRule<'a> {
    pub fn for_persona(persona: Persona, site: &'a SiteConfig) -> Self {
        match persona {
            Persona::Problem => ImageRule::BrokenAll {
                sentinel: &site.broken_image,
            },
            Persona::Visual => ImageRule::BrokenOnly {
                item: &site.visual_defect_item,
                sentinel: &site.broken_image,
            },
            _ => ImageRule::Fixture,
        }
    }

    /// Expected image for an item, given its rendered name
    pub fn expected_image<'b>(&self, observed_name: &str, record: &'b ProductRecord) -> &'b str
    where
        'a: 'b,
    {
        match *self {
            ImageRule::Fixture => &record.image_src,
            ImageRule::BrokenAll { sentinel } => sentinel,
            ImageRule::BrokenOnly { item, sentinel } if observed_name == item => sentinel,
            ImageRule::BrokenOnly { .. } => &record.image_src,
        }
    }
}

/// Compare rendered inventory items with the product fixture
///
/// A count mismatch is reported alone: items cannot be aligned by
/// position once the counts differ.
pub fn evaluate(
    observed: &[ObservedItem],
    expected: &[ProductRecord],
    persona: Persona,
    site: &SiteConfig,
) -> Vec<Discrepancy> {
    if observed.len() != expected.len() {
        return vec![Discrepancy::new(
            "inventory.count",
            expected.len().to_string(),
            observed.len().to_string(),
        )];
    }

    let rule = ImageRule::for_persona(persona, site);
    let mut discrepancies = Vec::new();

    for (i, (item, record)) in observed.iter().zip(expected).enumerate() {
        let fields = [
            ("name", record.name.as_str(), Some(item.name.as_str())),
            (
                "description",
                record.description.as_str(),
                Some(item.description.as_str()),
            ),
            ("price", record.price.as_str(), Some(item.price.as_str())),
            (
                "image_src",
                rule.expected_image(&item.name, record),
                item.image_src.as_deref(),
            ),
        ];

        for (field, want, got) in fields {
            if got != Some(want) {
                discrepancies
                    .push(Discrepancy::new(field, want, got.unwrap_or(MISSING)).at(i));
            }
        }
    }

    discrepancies
}

fn expect_equal(out: &mut Vec<Discrepancy>, field: &str, expected: &str, observed: Option<&str>) {
    if observed != Some(expected) {
        out.push(Discrepancy::new(field, expected, observed.unwrap_or(MISSING)));
    }
}

fn expect_contains(out: &mut Vec<Discrepancy>, field: &str, expected: &str, observed: Option<&str>) {
    if !observed.map(|o| o.contains(expected)).unwrap_or(false) {
        out.push(Discrepancy::new(
            field,
            format!("containing '{}'", expected),
            observed.unwrap_or(MISSING),
        ));
    }
}

fn expect_presence(out: &mut Vec<Discrepancy>, field: &str, expected: bool, observed: Option<bool>) {
    if observed != Some(expected) {
        let describe = |p: bool| if p { "present" } else { "absent" };
        out.push(Discrepancy::new(
            field,
            describe(expected),
            observed.map(describe).unwrap_or(MISSING),
        ));
    }
}

/// Check the login page renders its form as expected
pub fn check_landing(obs: &Observations, site: &SiteConfig) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    expect_contains(&mut out, "logo", &site.logo_title, obs.text(pages::LOGIN_LOGO));
    expect_equal(
        &mut out,
        "username.placeholder",
        "Username",
        obs.attribute(pages::USERNAME, "placeholder").flatten(),
    );
    expect_equal(
        &mut out,
        "password.placeholder",
        "Password",
        obs.attribute(pages::PASSWORD, "placeholder").flatten(),
    );
    expect_equal(
        &mut out,
        "password.type",
        "password",
        obs.attribute(pages::PASSWORD, "type").flatten(),
    );
    expect_equal(
        &mut out,
        "login_button.value",
        "Login",
        obs.attribute(pages::LOGIN_BUTTON, "value").flatten(),
    );
    out
}

/// Check a login attempt's outcome for the given persona
pub fn check_login(obs: &Observations, persona: Persona, site: &SiteConfig) -> Vec<Discrepancy> {
    if persona.is_locked_out() {
        return check_locked_out(obs, site);
    }

    let mut out = Vec::new();
    if obs.presence(pages::ERROR) != Some(false) {
        out.push(Discrepancy::new(
            "login.error",
            "absent",
            obs.text(pages::ERROR).unwrap_or("present"),
        ));
    }
    expect_equal(&mut out, "login.url", &site.inventory_url, obs.url());
    out
}

/// Check the locked-out persona is rejected with a dismissible error
pub fn check_locked_out(obs: &Observations, site: &SiteConfig) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    expect_presence(&mut out, "login.error", true, obs.first_presence(pages::ERROR));
    expect_contains(
        &mut out,
        "login.error_text",
        &site.locked_out_message,
        obs.text(pages::ERROR),
    );
    expect_presence(
        &mut out,
        "login.dismiss_control",
        true,
        obs.first_presence(pages::ERROR_BUTTON),
    );
    expect_presence(
        &mut out,
        "login.dismissed",
        false,
        obs.presence(pages::ERROR_BUTTON),
    );
    out
}

/// Check that opening the inventory without a session bounces to login
pub fn check_unauthenticated(obs: &Observations, site: &SiteConfig) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    expect_equal(&mut out, "redirect.url", &site.entry_url, obs.url());
    expect_contains(
        &mut out,
        "redirect.error_text",
        &site.access_message,
        obs.text(pages::ERROR),
    );
    expect_presence(
        &mut out,
        "redirect.dismiss_control",
        true,
        obs.presence(pages::ERROR_BUTTON),
    );
    out
}

/// Check declarative expectations from a YAML scenario
pub fn check_expectations(obs: &Observations, expectations: &[Expectation]) -> Vec<Discrepancy> {
    use crate::testing::Observed;

    let mut out = Vec::new();
    for exp in expectations {
        let value = obs.get(&exp.key);
        let rendered = value.map(Observed::describe);

        if let Some(equals) = &exp.equals {
            expect_equal(&mut out, &exp.key, equals, rendered.as_deref());
        }
        if let Some(contains) = &exp.contains {
            expect_contains(&mut out, &exp.key, contains, rendered.as_deref());
        }
        if let Some(present) = exp.present {
            let observed = match value {
                Some(Observed::Presence(p)) => Some(*p),
                _ => None,
            };
            expect_presence(&mut out, &exp.key, present, observed);
        }
        if let Some(count) = exp.count {
            let observed = match value {
                Some(Observed::Items(items)) => Some(items.len().to_string()),
                _ => None,
            };
            expect_equal(&mut out, &exp.key, &count.to_string(), observed.as_deref());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Observed;

    fn catalog() -> Vec<ProductRecord> {
        ["Sauce Labs Backpack", "Sauce Labs Bike Light", "Sauce Labs Onesie"]
            .iter()
            .enumerate()
            .map(|(i, name)| ProductRecord {
                name: name.to_string(),
                description: format!("description {}", i),
                price: format!("${}.99", i),
                image_src: format!("/img/{}.jpg", i),
            })
            .collect()
    }

    fn rendered(catalog: &[ProductRecord], image: impl Fn(&ProductRecord) -> String) -> Vec<ObservedItem> {
        catalog
            .iter()
            .map(|p| ObservedItem {
                name: p.name.clone(),
                description: p.description.clone(),
                price: p.price.clone(),
                image_src: Some(image(p)),
            })
            .collect()
    }

    #[test]
    fn test_standard_matches_fixture() {
        let site = SiteConfig::default();
        let catalog = catalog();
        let observed = rendered(&catalog, |p| p.image_src.clone());
        assert!(evaluate(&observed, &catalog, Persona::Standard, &site).is_empty());
    }

    #[test]
    fn test_problem_expects_sentinel_everywhere() {
        let site = SiteConfig::default();
        let catalog = catalog();
        let broken = rendered(&catalog, |_| site.broken_image.clone());
        assert!(evaluate(&broken, &catalog, Persona::Problem, &site).is_empty());

        // Real images are a failure for this persona
        let healthy = rendered(&catalog, |p| p.image_src.clone());
        let found = evaluate(&healthy, &catalog, Persona::Problem, &site);
        assert_eq!(found.len(), catalog.len());
        assert!(found.iter().all(|d| d.field == "image_src" && d.expected == site.broken_image));
    }

    #[test]
    fn test_visual_expects_sentinel_on_backpack_only() {
        let site = SiteConfig::default();
        let catalog = catalog();
        let observed = rendered(&catalog, |p| {
            if p.name == "Sauce Labs Backpack" {
                site.broken_image.clone()
            } else {
                p.image_src.clone()
            }
        });
        assert!(evaluate(&observed, &catalog, Persona::Visual, &site).is_empty());

        // All-broken images are wrong for the visual persona
        let all_broken = rendered(&catalog, |_| site.broken_image.clone());
        let found = evaluate(&all_broken, &catalog, Persona::Visual, &site);
        let indexes: Vec<_> = found.iter().map(|d| d.item_index).collect();
        assert_eq!(indexes, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_count_mismatch_is_reported_alone() {
        let site = SiteConfig::default();
        let catalog = catalog();
        let mut observed = rendered(&catalog, |p| p.image_src.clone());
        observed.pop();
        let found = evaluate(&observed, &catalog, Persona::Standard, &site);
        assert_eq!(found, vec![Discrepancy::new("inventory.count", "3", "2")]);
    }

    #[test]
    fn test_field_mismatch_detail() {
        let site = SiteConfig::default();
        let catalog = catalog();
        let mut observed = rendered(&catalog, |p| p.image_src.clone());
        observed[2].price = "$99.99".into();
        observed[0].image_src = None;
        let found = evaluate(&observed, &catalog, Persona::Error, &site);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].to_string(), "item 0 image_src: expected '/img/0.jpg', observed '<missing>'");
        assert_eq!(found[1].field, "price");
        assert_eq!(found[1].item_index, Some(2));
    }

    fn locked_out_observations(site: &SiteConfig, dismissed: bool) -> Observations {
        let mut obs = Observations::default();
        obs.push(5, "present:error".into(), Observed::Presence(true));
        obs.push(6, "text:error".into(), Observed::Text(site.locked_out_message.clone()));
        obs.push(7, "present:error_button".into(), Observed::Presence(true));
        obs.push(9, "present:error_button".into(), Observed::Presence(!dismissed));
        obs
    }

    #[test]
    fn test_locked_out_dismissible() {
        let site = SiteConfig::default();
        let obs = locked_out_observations(&site, true);
        assert!(check_login(&obs, Persona::LockedOut, &site).is_empty());

        let obs = locked_out_observations(&site, false);
        let found = check_login(&obs, Persona::LockedOut, &site);
        assert_eq!(found, vec![Discrepancy::new("login.dismissed", "absent", "present")]);
    }

    #[test]
    fn test_baseline_login_requires_inventory_url() {
        let site = SiteConfig::default();
        let mut obs = Observations::default();
        obs.push(5, "present:error".into(), Observed::Presence(false));
        obs.push(6, "url".into(), Observed::Url(site.inventory_url.clone()));
        assert!(check_login(&obs, Persona::PerformanceGlitch, &site).is_empty());

        let mut obs = Observations::default();
        obs.push(5, "present:error".into(), Observed::Presence(true));
        obs.push(6, "text:error".into(), Observed::Text("Epic sadface: nope".into()));
        let found = check_login(&obs, Persona::Standard, &site);
        assert_eq!(found[0].observed, "Epic sadface: nope");
        assert_eq!(found[1].field, "login.url");
    }

    #[test]
    fn test_unauthenticated_redirect() {
        let site = SiteConfig::default();
        let mut obs = Observations::default();
        obs.push(2, "url".into(), Observed::Url(site.entry_url.clone()));
        obs.push(3, "present:error".into(), Observed::Presence(true));
        obs.push(4, "text:error".into(), Observed::Text(site.access_message.clone()));
        obs.push(5, "present:error_button".into(), Observed::Presence(true));
        assert!(check_unauthenticated(&obs, &site).is_empty());

        let mut obs = Observations::default();
        obs.push(2, "url".into(), Observed::Url(site.inventory_url.clone()));
        let found = check_unauthenticated(&obs, &site);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_landing_checks() {
        let site = SiteConfig::default();
        let mut obs = Observations::default();
        obs.push(2, "text:login_logo".into(), Observed::Text("Swag Labs".into()));
        obs.push(3, "attr:username:placeholder".into(), Observed::Attribute(Some("Username".into())));
        obs.push(4, "attr:password:placeholder".into(), Observed::Attribute(Some("Password".into())));
        obs.push(5, "attr:password:type".into(), Observed::Attribute(Some("text".into())));
        obs.push(6, "attr:login_button:value".into(), Observed::Attribute(None));
        let found = check_landing(&obs, &site);
        let fields: Vec<_> = found.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["password.type", "login_button.value"]);
    }

    #[test]
    fn test_yaml_expectations() {
        let mut obs = Observations::default();
        obs.push(1, "url".into(), Observed::Url("https://x/inventory.html".into()));
        obs.push(2, "present:error".into(), Observed::Presence(false));
        let expectations = vec![
            Expectation {
                key: "url".into(),
                equals: None,
                contains: Some("inventory".into()),
                present: None,
                count: None,
            },
            Expectation {
                key: "present:error".into(),
                equals: None,
                contains: None,
                present: Some(true),
                count: None,
            },
        ];
        let found = check_expectations(&obs, &expectations);
        assert_eq!(found, vec![Discrepancy::new("present:error", "present", "absent")]);
    }
}
