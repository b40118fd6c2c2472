//! Execution history analysis
//!
//! Every function here is a pure transformation over an already-fetched,
//! immutable event list. None of them fail: malformed payloads, unpaired
//! events and empty histories degrade to empty, zero or `None` results so a
//! single bad event cannot abort the rest of an analysis.

mod data_flow;
mod output;
mod pairing;
mod performance;
mod sla;
mod success;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::history::{EventKind, ExecutionEvent};

pub use data_flow::{analyze_data_flow, DataFlowAnalysis, DataFlowEdge, Transformation};
pub use output::{compare_output, get_state_output, verify_state_output, OutputVerification, StateOutputRecord};
pub use pairing::{pair_states, StateInterval};
pub use performance::{analyze_performance, analyze_performance_at, PerformanceSummary, StateDuration};
pub use sla::{verify_slas, SlaMetrics, SlaThresholds, SlaVerificationResult};
pub use success::{
    classify_execution, execution_status, state_order, ExecutionStatus, ExecutionSuccess,
};

/// A parsed state payload: always a JSON object, possibly empty
pub type Payload = Map<String, Value>;

/// Best-effort payload parsing
///
/// Absent, empty, invalid or non-object JSON all yield an empty object.
pub fn parse_payload(raw: Option<&str>) -> Payload {
    let Some(raw) = raw else {
        return Payload::new();
    };
    if raw.trim().is_empty() {
        return Payload::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "Payload is not an object, treating as empty");
            Payload::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable payload, treating as empty");
            Payload::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Start and end markers of an execution, each the first of its kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ExecutionBounds {
    pub started: Option<DateTime<Utc>>,
    pub succeeded: Option<DateTime<Utc>>,
    /// First terminal event of any outcome
    pub finished: Option<DateTime<Utc>>,
}

pub(crate) fn execution_bounds(events: &[ExecutionEvent]) -> ExecutionBounds {
    let mut bounds = ExecutionBounds::default();

    for event in events {
        if let EventKind::ExecutionStarted { .. } = event.kind {
            bounds.started.get_or_insert(event.timestamp);
        }
        if let EventKind::ExecutionSucceeded { .. } = event.kind {
            bounds.succeeded.get_or_insert(event.timestamp);
        }
        if event.kind.is_terminal() {
            bounds.finished.get_or_insert(event.timestamp);
        }
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_object() {
        let payload = parse_payload(Some(r#"{"a": 1, "b": [1, 2]}"#));
        assert_eq!(payload.get("a"), Some(&json!(1)));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_parse_payload_degrades_to_empty() {
        assert!(parse_payload(None).is_empty());
        assert!(parse_payload(Some("")).is_empty());
        assert!(parse_payload(Some("   ")).is_empty());
        assert!(parse_payload(Some("{not json")).is_empty());
        assert!(parse_payload(Some("[1, 2, 3]")).is_empty());
        assert!(parse_payload(Some("42")).is_empty());
        assert!(parse_payload(Some("null")).is_empty());
    }
}
