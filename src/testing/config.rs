//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::Deserialize;
use std::path::PathBuf;

use crate::analysis::{Payload, SlaThresholds};

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Execution ARN, or a path to a history file
    pub execution: String,
    /// Directory histories are resolved in, relative to the scenario file
    pub history_dir: Option<PathBuf>,
    /// Wait for the execution to complete before running the steps
    pub wait: Option<WaitConfig>,
    /// The sequence of assertions to run
    pub steps: Vec<TestStep>,
}

/// Poller timing for the completion wait
#[derive(Deserialize, Debug)]
pub struct WaitConfig {
    /// Timeout in milliseconds (default from config)
    pub timeout_ms: Option<u64>,
    /// Interval between polls in milliseconds (default from config)
    pub interval_ms: Option<u64>,
}

/// A single assertion about the execution
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// No state failed and every listed state ran
    ExpectSuccess {
        #[serde(default)]
        states: Vec<String>,
    },
    /// Some state failed; if states are listed, each of them failed
    ExpectFailure {
        #[serde(default)]
        states: Vec<String>,
    },
    /// The listed states were entered in this order (other states may interleave)
    ExpectOrder { states: Vec<String> },
    /// The state's output contains these fields
    ExpectOutput { state: String, output: Payload },
    /// Performance stays within these limits
    ExpectSla {
        max_total_execution_time_ms: Option<u64>,
        max_state_execution_time_ms: Option<u64>,
        max_cold_start_time_ms: Option<u64>,
    },
    /// Data loss / corruption heuristics match
    ExpectDataFlow {
        data_loss: Option<bool>,
        data_corruption: Option<bool>,
    },
}

impl TestStep {
    /// Thresholds of an `expect_sla` step
    pub fn sla_thresholds(&self) -> Option<SlaThresholds> {
        match self {
            TestStep::ExpectSla {
                max_total_execution_time_ms,
                max_state_execution_time_ms,
                max_cold_start_time_ms,
            } => Some(SlaThresholds {
                max_total_execution_time_ms: *max_total_execution_time_ms,
                max_state_execution_time_ms: *max_state_execution_time_ms,
                max_cold_start_time_ms: *max_cold_start_time_ms,
            }),
            _ => None,
        }
    }

    /// Short label for progress output
    pub fn label(&self) -> String {
        match self {
            TestStep::ExpectSuccess { states } if states.is_empty() => "expect success".to_string(),
            TestStep::ExpectSuccess { states } => format!("expect success ({})", states.join(", ")),
            TestStep::ExpectFailure { .. } => "expect failure".to_string(),
            TestStep::ExpectOrder { states } => format!("expect order ({})", states.join(" → ")),
            TestStep::ExpectOutput { state, .. } => format!("expect output of '{}'", state),
            TestStep::ExpectSla { .. } => "expect SLA".to_string(),
            TestStep::ExpectDataFlow { .. } => "expect data flow".to_string(),
        }
    }
}
