//! Execution history event types
//!
//! Raw history events carry arbitrary JSON detail objects whose shape depends
//! on the event type. They are decoded into [`EventKind`], a tagged union in
//! which each variant only exposes the fields that event type guarantees.
//! Anything that cannot be classified lands in [`EventKind::Other`].
//!
//! Two wire shapes are accepted per event:
//! - flat: `{timestamp, type, stateName, input, output}`
//! - the `GetExecutionHistory` shape, with `stateEnteredEventDetails`,
//!   `stateExitedEventDetails`, `taskFailedEventDetails`, etc.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::common::{Error, Result};

/// A single timestamped fact about an execution
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    /// Event id within the history, when the source provides one
    pub id: Option<i64>,
    pub kind: EventKind,
}

/// What happened, with the fields guaranteed for that event type
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    ExecutionStarted {
        input: Option<String>,
    },
    ExecutionSucceeded {
        output: Option<String>,
    },
    ExecutionFailed {
        error: Option<String>,
        cause: Option<String>,
    },
    ExecutionAborted,
    ExecutionTimedOut,
    /// Any `*StateEntered` event; `state_type` is the prefix (`Task`, `Pass`, ...)
    StateEntered {
        state_type: String,
        name: String,
        input: Option<String>,
    },
    /// Any `*StateExited` event
    StateExited {
        state_type: String,
        name: String,
        output: Option<String>,
    },
    TaskFailed {
        name: Option<String>,
        error: Option<String>,
        cause: Option<String>,
    },
    StateFailed {
        name: Option<String>,
        error: Option<String>,
        cause: Option<String>,
    },
    /// Unknown event types, and entered/exited events without a state name
    Other {
        event_type: String,
    },
}

impl EventKind {
    /// The event type as it appears on the wire
    pub fn type_name(&self) -> String {
        match self {
            EventKind::ExecutionStarted { .. } => "ExecutionStarted".to_string(),
            EventKind::ExecutionSucceeded { .. } => "ExecutionSucceeded".to_string(),
            EventKind::ExecutionFailed { .. } => "ExecutionFailed".to_string(),
            EventKind::ExecutionAborted => "ExecutionAborted".to_string(),
            EventKind::ExecutionTimedOut => "ExecutionTimedOut".to_string(),
            EventKind::StateEntered { state_type, .. } => format!("{}StateEntered", state_type),
            EventKind::StateExited { state_type, .. } => format!("{}StateExited", state_type),
            EventKind::TaskFailed { .. } => "TaskFailed".to_string(),
            EventKind::StateFailed { .. } => "StateFailed".to_string(),
            EventKind::Other { event_type } => event_type.clone(),
        }
    }

    /// Whether this event ends the execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::ExecutionSucceeded { .. }
                | EventKind::ExecutionFailed { .. }
                | EventKind::ExecutionAborted
                | EventKind::ExecutionTimedOut
        )
    }
}

impl ExecutionEvent {
    pub fn new(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            timestamp,
            id: None,
            kind,
        }
    }

    pub fn execution_started(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, EventKind::ExecutionStarted { input: None })
    }

    pub fn execution_succeeded(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, EventKind::ExecutionSucceeded { output: None })
    }

    /// A `TaskStateEntered` event
    pub fn state_entered(timestamp: DateTime<Utc>, name: &str, input: Option<&str>) -> Self {
        Self::new(
            timestamp,
            EventKind::StateEntered {
                state_type: "Task".to_string(),
                name: name.to_string(),
                input: input.map(str::to_string),
            },
        )
    }

    /// A `TaskStateExited` event
    pub fn state_exited(timestamp: DateTime<Utc>, name: &str, output: Option<&str>) -> Self {
        Self::new(
            timestamp,
            EventKind::StateExited {
                state_type: "Task".to_string(),
                name: name.to_string(),
                output: output.map(str::to_string),
            },
        )
    }

    pub fn task_failed(timestamp: DateTime<Utc>, name: Option<&str>) -> Self {
        Self::new(
            timestamp,
            EventKind::TaskFailed {
                name: name.map(str::to_string),
                error: None,
                cause: None,
            },
        )
    }

    /// Name of the state this event belongs to, if it resolves one
    pub fn state_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::StateEntered { name, .. } | EventKind::StateExited { name, .. } => {
                Some(name)
            }
            EventKind::TaskFailed { name, .. } | EventKind::StateFailed { name, .. } => {
                name.as_deref()
            }
            _ => None,
        }
    }

    pub fn millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Parse a history document
///
/// Accepts a bare array of events or an object with an `events` array, as
/// written by `aws stepfunctions get-execution-history`. Events are decoded
/// one at a time: an event without a usable timestamp or type is skipped
/// with a warning, and a malformed optional field reads as absent.
pub fn parse_history(content: &str) -> Result<Vec<ExecutionEvent>> {
    let items = match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => items,
        Value::Object(mut document) => match document.remove("events") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::InvalidHistory(
                    "object has no `events` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::InvalidHistory(
                "expected an array of events or an object with an `events` array".to_string(),
            ))
        }
    };

    let events = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<ExecutionEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping undecodable history event");
                None
            }
        })
        .collect();

    Ok(events)
}

// === Wire decoding ===

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(DateTime<Utc>),
    EpochSeconds(f64),
}

impl TryFrom<RawTimestamp> for DateTime<Utc> {
    type Error = String;

    fn try_from(raw: RawTimestamp) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawTimestamp::Text(ts) => Ok(ts),
            RawTimestamp::EpochSeconds(secs) => {
                DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                    .ok_or_else(|| format!("epoch timestamp {} is out of range", secs))
            }
        }
    }
}

/// Decode an optional field, reading a value of the wrong shape as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring malformed event field");
        None
    }))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawDetails {
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    input: Option<Value>,
    output: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    error: Option<String>,
    #[serde(deserialize_with = "lenient")]
    cause: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    timestamp: RawTimestamp,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, deserialize_with = "lenient")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    state_name: Option<String>,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    cause: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    execution_started_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    execution_succeeded_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    execution_failed_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    state_entered_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    state_exited_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    task_failed_event_details: Option<RawDetails>,
    #[serde(default, deserialize_with = "lenient")]
    state_failed_event_details: Option<RawDetails>,
}

/// Payloads are normally JSON-encoded strings; anything else is re-encoded
fn payload_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl TryFrom<RawEvent> for ExecutionEvent {
    type Error = String;

    fn try_from(raw: RawEvent) -> std::result::Result<Self, Self::Error> {
        let timestamp = DateTime::try_from(raw.timestamp)?;
        let event_type = raw.event_type;

        let kind = match event_type.as_str() {
            "ExecutionStarted" => {
                let details = raw.execution_started_event_details.unwrap_or_default();
                EventKind::ExecutionStarted {
                    input: payload_text(details.input.or(raw.input)),
                }
            }
            "ExecutionSucceeded" => {
                let details = raw.execution_succeeded_event_details.unwrap_or_default();
                EventKind::ExecutionSucceeded {
                    output: payload_text(details.output.or(raw.output)),
                }
            }
            "ExecutionFailed" => {
                let details = raw.execution_failed_event_details.unwrap_or_default();
                EventKind::ExecutionFailed {
                    error: details.error.or(raw.error),
                    cause: details.cause.or(raw.cause),
                }
            }
            "ExecutionAborted" => EventKind::ExecutionAborted,
            "ExecutionTimedOut" => EventKind::ExecutionTimedOut,
            "TaskFailed" => {
                let details = raw.task_failed_event_details.unwrap_or_default();
                EventKind::TaskFailed {
                    name: raw.state_name.or(details.name),
                    error: details.error.or(raw.error),
                    cause: details.cause.or(raw.cause),
                }
            }
            "StateFailed" => {
                let details = raw.state_failed_event_details.unwrap_or_default();
                EventKind::StateFailed {
                    name: raw.state_name.or(details.name),
                    error: details.error.or(raw.error),
                    cause: details.cause.or(raw.cause),
                }
            }
            t if t.ends_with("StateEntered") => {
                let details = raw.state_entered_event_details.unwrap_or_default();
                match raw.state_name.or(details.name) {
                    Some(name) => EventKind::StateEntered {
                        state_type: t.trim_end_matches("StateEntered").to_string(),
                        name,
                        input: payload_text(details.input.or(raw.input)),
                    },
                    None => {
                        tracing::debug!(event_type = t, "State event without a state name");
                        EventKind::Other {
                            event_type: event_type.clone(),
                        }
                    }
                }
            }
            t if t.ends_with("StateExited") => {
                let details = raw.state_exited_event_details.unwrap_or_default();
                match raw.state_name.or(details.name) {
                    Some(name) => EventKind::StateExited {
                        state_type: t.trim_end_matches("StateExited").to_string(),
                        name,
                        output: payload_text(details.output.or(raw.output)),
                    },
                    None => {
                        tracing::debug!(event_type = t, "State event without a state name");
                        EventKind::Other {
                            event_type: event_type.clone(),
                        }
                    }
                }
            }
            _ => EventKind::Other {
                event_type: event_type.clone(),
            },
        };

        Ok(Self {
            timestamp,
            id: raw.id,
            kind,
        })
    }
}
