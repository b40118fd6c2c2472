//! Scenario test runner
//!
//! Reads YAML test scenarios describing one execution and a list of
//! assertions, and checks each assertion against the analysed history.

mod config;
mod runner;

pub use config::*;
pub use runner::{run_scenario, TestResult};
