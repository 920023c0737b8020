//! Login flow
//!
//! The step sequences shared by every scenario that signs in, plus the
//! credential scrape from the login page.

use crate::common::config::SiteConfig;
use crate::common::{Error, Result};
use crate::fixtures::{credentials_from_listing, UserCredential};
use crate::pages;

use super::config::Step;
use super::runner::{Execution, Outcome, Runner};

/// Open the login page, submit the credential and probe for an error
pub fn login_steps(site: &SiteConfig, credential: &UserCredential) -> Vec<Step> {
    vec![
        Step::Navigate {
            url: site.entry_url.clone(),
        },
        Step::Type {
            element: pages::USERNAME.to_string(),
            text: credential.username.clone(),
        },
        Step::Type {
            element: pages::PASSWORD.to_string(),
            text: site.password.clone(),
        },
        Step::Click {
            element: pages::LOGIN_BUTTON.to_string(),
        },
        Step::Probe {
            element: pages::ERROR.to_string(),
            timeout_ms: None,
        },
    ]
}

/// Read the error shown on the login page and look for its dismiss control
fn error_steps() -> Vec<Step> {
    vec![
        Step::ReadText {
            element: pages::ERROR.to_string(),
        },
        Step::Probe {
            element: pages::ERROR_BUTTON.to_string(),
            timeout_ms: None,
        },
    ]
}

fn dismiss_steps() -> Vec<Step> {
    vec![
        Step::Click {
            element: pages::ERROR_BUTTON.to_string(),
        },
        Step::AwaitAbsent {
            element: pages::ERROR_BUTTON.to_string(),
            timeout_ms: None,
        },
    ]
}

/// Sign in and record the outcome
///
/// When an error shows up its text and dismiss control are recorded, and
/// with `dismiss` the control is clicked. Otherwise the runner waits for
/// the inventory list and records the URL it landed on.
pub async fn run_login(
    runner: &mut Runner<'_>,
    exec: &mut Execution,
    site: &SiteConfig,
    credential: &UserCredential,
    dismiss: bool,
) -> Result<()> {
    if !runner.execute(exec, &login_steps(site, credential)).await? {
        return Ok(());
    }

    if exec.observations().presence(pages::ERROR) == Some(true) {
        if !runner.execute(exec, &error_steps()).await? {
            return Ok(());
        }
        if dismiss && exec.observations().presence(pages::ERROR_BUTTON) == Some(true) {
            runner.execute(exec, &dismiss_steps()).await?;
        }
    } else {
        let landed = [
            Step::Probe {
                element: pages::INVENTORY_LIST.to_string(),
                timeout_ms: Some(runner.timeouts().element_ms),
            },
            Step::ReadUrl,
        ];
        runner.execute(exec, &landed).await?;
    }
    Ok(())
}

/// Collect usernames from the credential listing on the login page
pub async fn scrape_credentials(
    runner: &mut Runner<'_>,
    site: &SiteConfig,
) -> Result<Vec<UserCredential>> {
    let steps = [Step::Navigate {
        url: site.entry_url.clone(),
    }];
    let exec = runner.run("credential scrape", None, &steps).await?;
    if !exec.is_running() {
        let reason = match exec.finish(Vec::new())?.outcome {
            Outcome::Aborted { reason, .. } => reason,
            other => format!("{:?}", other),
        };
        return Err(Error::Driver(format!("Cannot open login page: {}", reason)));
    }

    let html = runner.listing_html().await?;
    let users = credentials_from_listing(&html)?;
    tracing::info!(users = users.len(), "Scraped credentials from login page");
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Timeouts;
    use crate::driver::SimulatedStore;
    use crate::fixtures::{Persona, ProductRecord};
    use crate::pages::PageRegistry;

    fn fast() -> Timeouts {
        Timeouts {
            element_ms: 50,
            probe_ms: 20,
            poll_ms: 5,
            request_secs: 1,
        }
    }

    fn store(site: &SiteConfig, registry: &PageRegistry) -> SimulatedStore {
        let catalog = vec![ProductRecord {
            name: "Sauce Labs Backpack".into(),
            description: "bag".into(),
            price: "$29.99".into(),
            image_src: "/backpack.jpg".into(),
        }];
        SimulatedStore::new(site, registry, catalog).unwrap()
    }

    #[tokio::test]
    async fn test_locked_out_login_dismisses_error() {
        let site = SiteConfig::default();
        let registry = PageRegistry::from_site(&site).unwrap();
        let mut store = store(&site, &registry);
        let mut runner = Runner::new(&mut store, &registry, &fast());

        let credential = UserCredential::new("locked_out_user");
        assert_eq!(credential.persona, Persona::LockedOut);
        let mut exec = runner
            .start("locked", Some(credential.persona), Some("locked_out_user"))
            .await
            .unwrap();
        run_login(&mut runner, &mut exec, &site, &credential, true).await.unwrap();

        let obs = exec.observations();
        assert_eq!(obs.text(pages::ERROR), Some(site.locked_out_message.as_str()));
        assert_eq!(obs.first_presence(pages::ERROR_BUTTON), Some(true));
        assert_eq!(obs.presence(pages::ERROR_BUTTON), Some(false));
        assert_eq!(obs.url(), None);
    }

    #[tokio::test]
    async fn test_standard_login_records_url() {
        let site = SiteConfig::default();
        let registry = PageRegistry::from_site(&site).unwrap();
        let mut store = store(&site, &registry);
        let mut runner = Runner::new(&mut store, &registry, &fast());

        let credential = UserCredential::new("standard_user");
        let mut exec = runner.start("standard", None, None).await.unwrap();
        run_login(&mut runner, &mut exec, &site, &credential, true).await.unwrap();

        assert_eq!(exec.observations().presence(pages::ERROR), Some(false));
        assert_eq!(exec.observations().url(), Some(site.inventory_url.as_str()));
    }

    #[tokio::test]
    async fn test_scrape_credentials_from_listing() {
        let site = SiteConfig::default();
        let registry = PageRegistry::from_site(&site).unwrap();
        let mut store = store(&site, &registry).with_users(["standard_user", "visual_user"]);
        let mut runner = Runner::new(&mut store, &registry, &fast());

        let users = scrape_credentials(&mut runner, &site).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["standard_user", "visual_user"]);
        assert_eq!(users[1].persona, Persona::Visual);
    }
}
