//! Scenario execution
//!
//! Steps go in, an ordered observation log comes out. What the
//! observations should look like is decided by [`crate::assertions`].

mod config;
mod login;
mod observation;
mod runner;

pub use config::*;
pub use login::{login_steps, run_login, scrape_credentials};
pub use observation::{Observation, Observations, Observed, ObservedItem};
pub use runner::{run_scenario, Execution, Outcome, Runner, ScenarioResult, ScenarioState};
