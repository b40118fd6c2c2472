//! Execution outcome classification

use serde::Serialize;

use super::execution_bounds;
use crate::history::{EventKind, ExecutionEvent};

/// Name recorded for failure events that do not resolve a state
const UNKNOWN_STATE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSuccess {
    pub success: bool,
    /// Every entered state, in event order
    ///
    /// Entering a state counts as completing it, so a state that never exited
    /// is still listed here.
    pub completed_states: Vec<String>,
    pub failed_states: Vec<String>,
    /// ExecutionSucceeded minus ExecutionStarted, 0 if either is missing
    #[serde(rename = "executionTime")]
    pub execution_time_ms: i64,
}

/// Where an execution stands according to its history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Aborted => "ABORTED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
        };
        write!(f, "{}", s)
    }
}

/// Classify the execution against the states it was expected to run
///
/// Success requires no failed states and, when `expected_states` is not
/// empty, that every expected state was entered.
pub fn classify_execution<S: AsRef<str>>(events: &[ExecutionEvent], expected_states: &[S]) -> ExecutionSuccess {
    let mut completed_states = Vec::new();
    let mut failed_states = Vec::new();

    for event in events {
        match &event.kind {
            EventKind::StateEntered { name, .. } => completed_states.push(name.clone()),
            EventKind::TaskFailed { name, .. } | EventKind::StateFailed { name, .. } => {
                failed_states.push(name.clone().unwrap_or_else(|| UNKNOWN_STATE.to_string()))
            }
            _ => {}
        }
    }

    let bounds = execution_bounds(events);
    let execution_time_ms = match (bounds.started, bounds.succeeded) {
        (Some(start), Some(stop)) => (stop - start).num_milliseconds().max(0),
        _ => 0,
    };

    let all_expected_seen = expected_states
        .iter()
        .all(|expected| completed_states.iter().any(|s| s == expected.as_ref()));

    ExecutionSuccess {
        success: failed_states.is_empty() && all_expected_seen,
        completed_states,
        failed_states,
        execution_time_ms,
    }
}

/// Status implied by the last terminal event, `Running` if there is none
pub fn execution_status(events: &[ExecutionEvent]) -> ExecutionStatus {
    events
        .iter()
        .rev()
        .find_map(|event| match event.kind {
            EventKind::ExecutionSucceeded { .. } => Some(ExecutionStatus::Succeeded),
            EventKind::ExecutionFailed { .. } => Some(ExecutionStatus::Failed),
            EventKind::ExecutionAborted => Some(ExecutionStatus::Aborted),
            EventKind::ExecutionTimedOut => Some(ExecutionStatus::TimedOut),
            _ => None,
        })
        .unwrap_or(ExecutionStatus::Running)
}

/// Names of entered states in the order they were entered
pub fn state_order(events: &[ExecutionEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::StateEntered { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}
