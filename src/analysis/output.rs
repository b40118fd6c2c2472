//! State input/output extraction and expected-output verification

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{parse_payload, Payload};
use crate::history::{EventKind, ExecutionEvent};

/// Payloads seen for one entry into a state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateOutputRecord {
    pub state_name: String,
    pub input: Payload,
    /// `None` when no exited event with output exists for the state
    pub output: Option<Payload>,
    /// When the state was entered
    pub timestamp: DateTime<Utc>,
    /// Type of the entered event, e.g. `TaskStateEntered`
    pub event_type: String,
}

/// Outcome of comparing a state's output against expected fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputVerification {
    pub matches: bool,
    pub actual_output: Payload,
    /// Expected keys that are absent or carry a different value
    pub missing_fields: Vec<String>,
    /// Actual keys the expectation does not mention
    pub extra_fields: Vec<String>,
}

/// Collect input/output records for entered states, optionally for one name
///
/// The output of each record comes from the first exited event anywhere in
/// the history with the same state name that carries output. When a state
/// runs more than once, every record therefore reports the first
/// occurrence's output.
pub fn get_state_output(events: &[ExecutionEvent], state_name: Option<&str>) -> Vec<StateOutputRecord> {
    events
        .iter()
        .filter_map(|event| match &event.kind {
            EventKind::StateEntered { name, input, .. }
                if state_name.map_or(true, |wanted| wanted == name) =>
            {
                Some(StateOutputRecord {
                    state_name: name.clone(),
                    input: parse_payload(input.as_deref()),
                    output: find_exit_output(events, name).map(|raw| parse_payload(Some(raw))),
                    timestamp: event.timestamp,
                    event_type: event.kind.type_name(),
                })
            }
            _ => None,
        })
        .collect()
}

fn find_exit_output<'a>(events: &'a [ExecutionEvent], state_name: &str) -> Option<&'a str> {
    events.iter().find_map(|event| match &event.kind {
        EventKind::StateExited { name, output, .. } if name == state_name => output.as_deref(),
        _ => None,
    })
}

/// Check that `state_name` produced at least the `expected` fields
///
/// Extra fields in the actual output never cause a mismatch. When the state
/// has no recorded output, every expected key is reported missing.
pub fn verify_state_output(
    events: &[ExecutionEvent],
    state_name: &str,
    expected: &Payload,
) -> OutputVerification {
    let actual = get_state_output(events, Some(state_name))
        .into_iter()
        .find_map(|record| record.output);

    if actual.is_none() {
        tracing::debug!(state = state_name, "No output recorded for state");
    }
    compare_output(actual.as_ref(), expected)
}

/// Compare an actual output (if any) against expected fields
pub fn compare_output(actual: Option<&Payload>, expected: &Payload) -> OutputVerification {
    let Some(actual) = actual else {
        return OutputVerification {
            matches: false,
            actual_output: Payload::new(),
            missing_fields: expected.keys().cloned().collect(),
            extra_fields: Vec::new(),
        };
    };

    let missing_fields: Vec<String> = expected
        .iter()
        .filter(|(key, want)| !actual.get(*key).is_some_and(|got| values_match(got, want)))
        .map(|(key, _)| key.clone())
        .collect();

    let extra_fields: Vec<String> = actual
        .keys()
        .filter(|key| !expected.contains_key(*key))
        .cloned()
        .collect();

    OutputVerification {
        matches: missing_fields.is_empty(),
        actual_output: actual.clone(),
        missing_fields,
        extra_fields,
    }
}

/// Deep equality where numbers compare by value (`1 == 1.0`)
fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_match(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| values_match(v, w)))
        }
        _ => actual == expected,
    }
}
