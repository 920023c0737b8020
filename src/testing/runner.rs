//! Scenario runner
//!
//! Drives a [`Browser`] through ordered steps, resolving logical element
//! names through the page registry and recording what each step observes.
//! A step that cannot complete aborts its scenario; the runner itself
//! keeps going so the next scenario can run on the same session.

use std::time::{Duration, Instant};

use colored::Colorize;
use serde::Serialize;

use crate::assertions::{self, Discrepancy};
use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::driver::{Browser, ElementHandle};
use crate::fixtures::Persona;
use crate::pages::{self, Locator, PageRegistry};

use super::config::{Step, TestScenario};
use super::observation::{Observations, Observed, ObservedItem};

/// Lifecycle of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Pending,
    Running,
    Passed,
    Failed,
    Aborted,
}

impl ScenarioState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScenarioState::Passed | ScenarioState::Failed | ScenarioState::Aborted
        )
    }

    fn transition(self, next: ScenarioState) -> Result<ScenarioState> {
        use ScenarioState::*;
        match (self, next) {
            (Pending, Running) | (Pending, Aborted) => Ok(next),
            (Running, Passed) | (Running, Failed) | (Running, Aborted) => Ok(next),
            _ => Err(Error::Internal(format!(
                "Illegal scenario transition {:?} -> {:?}",
                self, next
            ))),
        }
    }
}

/// Final verdict of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed {
        discrepancies: Vec<Discrepancy>,
    },
    Aborted {
        step_index: usize,
        step: String,
        reason: String,
    },
}

/// Everything recorded about one finished scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub steps_executed: usize,
    pub steps_total: usize,
    pub observations: Observations,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// The first problem as an error, or `None` for a passed scenario
    pub fn error(&self) -> Option<Error> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Failed { discrepancies } => discrepancies.first().map(|d| {
                let field = match d.item_index {
                    Some(i) => format!("items[{}].{}", i, d.field),
                    None => d.field.clone(),
                };
                Error::AssertionMismatch {
                    field,
                    expected: d.expected.clone(),
                    observed: d.observed.clone(),
                }
            }),
            Outcome::Aborted {
                step_index,
                step,
                reason,
            } => Some(Error::step_failed(*step_index, step, reason)),
        }
    }
}

#[derive(Debug, Clone)]
struct Abort {
    step_index: usize,
    step: String,
    reason: String,
}

/// A scenario in progress
#[derive(Debug)]
pub struct Execution {
    name: String,
    persona: Option<Persona>,
    username: Option<String>,
    state: ScenarioState,
    steps_executed: usize,
    steps_total: usize,
    observations: Observations,
    abort: Option<Abort>,
    started: Instant,
}

impl Execution {
    fn new(name: &str, persona: Option<Persona>, username: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            persona,
            username: username.map(str::to_string),
            state: ScenarioState::Pending,
            steps_executed: 0,
            steps_total: 0,
            observations: Observations::default(),
            abort: None,
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ScenarioState::Running
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }

    /// Announce steps that will run, so an abort reports the full plan
    pub fn plan(&mut self, steps: usize) {
        self.steps_total += steps;
    }

    fn abort(&mut self, step_index: usize, step: String, reason: String) -> Result<()> {
        self.state = self.state.transition(ScenarioState::Aborted)?;
        tracing::warn!(scenario = %self.name, step = step_index, "Scenario aborted: {}", reason);
        self.abort = Some(Abort {
            step_index,
            step,
            reason,
        });
        Ok(())
    }

    /// Close the scenario with the discrepancies its checks found
    ///
    /// An aborted scenario stays aborted whatever the discrepancies.
    pub fn finish(mut self, discrepancies: Vec<Discrepancy>) -> Result<ScenarioResult> {
        let outcome = match self.state {
            ScenarioState::Running if discrepancies.is_empty() => {
                self.state = self.state.transition(ScenarioState::Passed)?;
                Outcome::Passed
            }
            ScenarioState::Running => {
                self.state = self.state.transition(ScenarioState::Failed)?;
                Outcome::Failed { discrepancies }
            }
            ScenarioState::Aborted => {
                let abort = self.abort.take().ok_or_else(|| {
                    Error::Internal(format!("Scenario '{}' aborted without a cause", self.name))
                })?;
                Outcome::Aborted {
                    step_index: abort.step_index,
                    step: abort.step,
                    reason: abort.reason,
                }
            }
            state => {
                return Err(Error::Internal(format!(
                    "Cannot finish scenario '{}' in state {:?}",
                    self.name, state
                )))
            }
        };

        let duration_ms = self.started.elapsed().as_millis() as u64;
        tracing::info!(
            scenario = %self.name,
            state = ?self.state,
            duration_ms,
            "Scenario finished"
        );

        Ok(ScenarioResult {
            name: self.name,
            persona: self.persona,
            username: self.username,
            steps_executed: self.steps_executed,
            steps_total: self.steps_total.max(self.steps_executed),
            observations: self.observations,
            outcome,
            duration_ms,
        })
    }
}

#[derive(Clone, Copy)]
enum Read<'s> {
    Text,
    Attribute(&'s str),
}

/// Executes steps against a browser session
pub struct Runner<'a> {
    browser: &'a mut dyn Browser,
    registry: &'a PageRegistry,
    timeouts: Timeouts,
}

impl<'a> Runner<'a> {
    pub fn new(browser: &'a mut dyn Browser, registry: &'a PageRegistry, timeouts: &Timeouts) -> Self {
        Self {
            browser,
            registry,
            timeouts: timeouts.clone(),
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Begin a scenario from a logged-out session
    pub async fn start(
        &mut self,
        name: &str,
        persona: Option<Persona>,
        username: Option<&str>,
    ) -> Result<Execution> {
        let mut exec = Execution::new(name, persona, username);
        tracing::info!(scenario = name, "Starting scenario");

        match self.browser.clear_session().await {
            Ok(()) => exec.state = exec.state.transition(ScenarioState::Running)?,
            Err(e) => exec.abort(0, "clear session".to_string(), e.to_string())?,
        }
        Ok(exec)
    }

    /// Execute steps in order, stopping at the first one that fails
    ///
    /// Returns `Ok(false)` once the scenario is aborted. Only errors that
    /// invalidate the whole run, such as an unregistered element name,
    /// are returned as `Err`.
    pub async fn execute(&mut self, exec: &mut Execution, steps: &[Step]) -> Result<bool> {
        if !exec.is_running() {
            return Ok(false);
        }

        let pending = exec.steps_total.saturating_sub(exec.steps_executed);
        if steps.len() > pending {
            exec.plan(steps.len() - pending);
        }

        for step in steps {
            let index = exec.steps_executed + 1;
            tracing::debug!(scenario = %exec.name, step = index, "{}", step);

            match self.execute_step(step).await {
                Ok(observed) => {
                    exec.steps_executed = index;
                    if let (Some(key), Some(value)) = (step.observation_key(), observed) {
                        exec.observations.push(index, key, value);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    exec.abort(index, step.to_string(), e.to_string())?;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Run a whole scenario in one go, without checks
    pub async fn run(
        &mut self,
        name: &str,
        persona: Option<Persona>,
        steps: &[Step],
    ) -> Result<Execution> {
        let mut exec = self.start(name, persona, None).await?;
        exec.plan(steps.len());
        self.execute(&mut exec, steps).await?;
        Ok(exec)
    }

    fn locator(&self, element: &str) -> Result<Locator> {
        self.registry.resolve(element).cloned()
    }

    async fn execute_step(&mut self, step: &Step) -> Result<Option<Observed>> {
        match step {
            Step::Navigate { url } => {
                self.browser.navigate(url).await?;
                Ok(None)
            }
            Step::Type { element, text } => {
                let locator = self.locator(element)?;
                let handle = self.wait_for(&locator).await?;
                self.browser.type_text(&handle, text).await?;
                Ok(None)
            }
            Step::Click { element } => {
                let locator = self.locator(element)?;
                let handle = self.wait_for(&locator).await?;
                self.browser.click(&handle).await?;
                Ok(None)
            }
            Step::ReadText { element } => {
                let locator = self.locator(element)?;
                self.read(&locator, Read::Text).await.map(Some)
            }
            Step::ReadAttribute { element, attribute } => {
                let locator = self.locator(element)?;
                self.read(&locator, Read::Attribute(attribute)).await.map(Some)
            }
            Step::Probe {
                element,
                timeout_ms,
            } => {
                let locator = self.locator(element)?;
                let ms = timeout_ms.unwrap_or(self.timeouts.probe_ms);
                let present = self.probe(&locator, ms).await?;
                Ok(Some(Observed::Presence(present)))
            }
            Step::AwaitAbsent {
                element,
                timeout_ms,
            } => {
                let locator = self.locator(element)?;
                let ms = timeout_ms.unwrap_or(self.timeouts.probe_ms);
                let still_present = self.await_absent(&locator, ms).await?;
                Ok(Some(Observed::Presence(still_present)))
            }
            Step::ReadUrl => {
                let url = self.browser.current_url().await?;
                Ok(Some(Observed::Url(url)))
            }
            Step::ReadItems { container, item } => {
                let container = self.locator(container)?;
                let item = self.locator(item)?;
                let items = self.read_items(&container, &item).await?;
                Ok(Some(Observed::Items(items)))
            }
        }
    }

    /// Poll until an element is present, up to the element timeout
    pub(crate) async fn wait_for(&mut self, locator: &Locator) -> Result<ElementHandle> {
        let ms = self.timeouts.element_ms;
        let deadline = Instant::now() + Duration::from_millis(ms);
        loop {
            match self.browser.find_element(&locator.selector).await {
                Ok(handle) => return Ok(handle),
                Err(Error::ElementNotFound(_)) if Instant::now() < deadline => {
                    tokio::time::sleep(self.poll_interval()).await;
                }
                Err(Error::ElementNotFound(_)) => {
                    return Err(Error::timeout(format!("element {}", locator), ms));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether an element appears within `ms`; absence is not an error
    async fn probe(&mut self, locator: &Locator, ms: u64) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(ms);
        loop {
            if !self.browser.find_elements(&locator.selector).await?.is_empty() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Whether an element is still present after waiting `ms` for it to go
    async fn await_absent(&mut self, locator: &Locator, ms: u64) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(ms);
        loop {
            if self.browser.find_elements(&locator.selector).await?.is_empty() {
                return Ok(false);
            }
            if Instant::now() >= deadline {
                return Ok(true);
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Read from an element, re-locating it if the page re-rendered
    async fn read(&mut self, locator: &Locator, what: Read<'_>) -> Result<Observed> {
        let deadline = Instant::now() + Duration::from_millis(self.timeouts.element_ms);
        loop {
            let handle = self.wait_for(locator).await?;
            let result = match what {
                Read::Text => self
                    .browser
                    .text(&handle)
                    .await
                    .map(|t| Observed::Text(t.trim().to_string())),
                Read::Attribute(name) => self
                    .browser
                    .attribute(&handle, name)
                    .await
                    .map(Observed::Attribute),
            };
            match result {
                Err(Error::ElementNotFound(_)) if Instant::now() < deadline => {
                    tracing::debug!("Stale handle for {}, retrying", locator);
                }
                other => return other,
            }
        }
    }

    async fn read_items(&mut self, container: &Locator, item: &Locator) -> Result<Vec<ObservedItem>> {
        let name = self.locator(pages::ITEM_NAME)?;
        let description = self.locator(pages::ITEM_DESCRIPTION)?;
        let price = self.locator(pages::ITEM_PRICE)?;
        let image = self.locator(pages::ITEM_IMAGE)?;

        let list = self.wait_for(container).await?;
        let handles = self.browser.find_children(&list, &item.selector).await?;

        let mut items = Vec::with_capacity(handles.len());
        for handle in &handles {
            let name = self.child_text(handle, &name).await?;
            let description = self.child_text(handle, &description).await?;
            let price = self.child_text(handle, &price).await?;
            let image_src = match self.browser.find_children(handle, &image.selector).await?.first() {
                Some(img) => self.browser.attribute(img, "src").await?,
                None => None,
            };
            items.push(ObservedItem {
                name,
                description,
                price,
                image_src,
            });
        }
        tracing::debug!("Read {} items from {}", items.len(), container);
        Ok(items)
    }

    async fn child_text(&mut self, parent: &ElementHandle, locator: &Locator) -> Result<String> {
        let child = self
            .browser
            .find_child(parent, &locator.selector)
            .await
            .map_err(|e| match e {
                Error::ElementNotFound(_) => Error::ElementNotFound(locator.to_string()),
                other => other,
            })?;
        Ok(self.browser.text(&child).await?.trim().to_string())
    }

    /// Markup of the credential listing on the current page
    pub async fn listing_html(&mut self) -> Result<String> {
        let locator = self.locator(pages::CREDENTIALS_LISTING)?;
        let handle = self.wait_for(&locator).await?;
        self.browser
            .property(&handle, "innerHTML")
            .await?
            .ok_or_else(|| {
                Error::fixture_malformed("login page credential listing", "listing has no markup")
            })
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_ms.max(1))
    }
}

/// Run a YAML scenario and check its expectations
///
/// Progress is printed as steps complete unless `json` is set, in which
/// case the caller reports the result.
pub async fn run_scenario(
    runner: &mut Runner<'_>,
    scenario: &TestScenario,
    verbose: bool,
    json: bool,
) -> Result<ScenarioResult> {
    if !json {
        println!(
            "\n{} {}",
            "Running Test:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("\n{}", "Steps:".cyan());
    }

    let mut exec = runner.start(&scenario.name, scenario.persona, None).await?;
    exec.plan(scenario.steps.len());

    for step in &scenario.steps {
        let index = exec.steps_executed() + 1;
        if !runner.execute(&mut exec, std::slice::from_ref(step)).await? {
            break;
        }
        if json {
            continue;
        }
        println!("  {} Step {}: {}", "✓".green(), index, step.to_string().dimmed());
        if verbose {
            if let Some(value) = step.observation_key().and_then(|k| exec.observations().get(&k)) {
                println!("      = {}", value.describe().dimmed());
            }
        }
    }

    let discrepancies = assertions::check_expectations(exec.observations(), &scenario.expect);
    let result = exec.finish(discrepancies)?;
    if json {
        return Ok(result);
    }

    match &result.outcome {
        Outcome::Passed => println!("\n{} {}\n", "✓".green().bold(), "Test Passed".green().bold()),
        Outcome::Failed { discrepancies } => {
            for d in discrepancies {
                println!("  {} {}", "✗".red(), d);
            }
            println!("\n{} {}\n", "✗".red().bold(), "Test Failed".red().bold());
        }
        Outcome::Aborted {
            step_index,
            step,
            reason,
        } => {
            println!("  {} Step {}: {} ({})", "✗".red(), step_index, step, reason);
            println!("\n{} {}\n", "✗".red().bold(), "Test Aborted".red().bold());
        }
    }
    Ok(result)
}
