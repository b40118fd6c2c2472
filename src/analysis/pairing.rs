//! Pairing of state entered/exited events into intervals

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{parse_payload, Payload};
use crate::history::{EventKind, ExecutionEvent};

/// One occurrence of a named state, from entry to exit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInterval {
    pub state_name: String,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub input_payload: Payload,
    pub output_payload: Payload,
}

impl StateInterval {
    pub fn duration_ms(&self) -> i64 {
        (self.exited_at - self.entered_at).num_milliseconds()
    }
}

/// Pair entered/exited events in a single left-to-right scan
///
/// An entered event opens an interval keyed by state name, replacing any
/// interval for that name still open. The next exited event with the same
/// name closes it. Intervals never closed are dropped, and every closed
/// occurrence of a repeated state is kept, in exit order.
pub fn pair_states(events: &[ExecutionEvent]) -> Vec<StateInterval> {
    let mut open: HashMap<&str, (DateTime<Utc>, Option<&str>)> = HashMap::new();
    let mut intervals = Vec::new();

    for event in events {
        match &event.kind {
            EventKind::StateEntered { name, input, .. } => {
                if open
                    .insert(name.as_str(), (event.timestamp, input.as_deref()))
                    .is_some()
                {
                    tracing::debug!(state = %name, "State re-entered before exiting");
                }
            }
            EventKind::StateExited { name, output, .. } => match open.remove(name.as_str()) {
                Some((entered_at, input)) => intervals.push(StateInterval {
                    state_name: name.clone(),
                    entered_at,
                    exited_at: event.timestamp,
                    input_payload: parse_payload(input),
                    output_payload: parse_payload(output.as_deref()),
                }),
                None => {
                    tracing::debug!(state = %name, "State exited without a matching entry");
                }
            },
            _ => {}
        }
    }

    intervals
}
