//! Payload hand-off between adjacent states
//!
//! Loss and corruption are heuristics over key sets, not integrity checks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{parse_payload, Payload};
use crate::history::{EventKind, ExecutionEvent};

/// What left one state and what arrived at the next
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformation {
    pub output: Payload,
    pub input: Payload,
}

/// A hand-off from one state's exit to the immediately following entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowEdge {
    pub from_state: String,
    pub to_state: String,
    pub transformation: Transformation,
    /// When the receiving state was entered
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowAnalysis {
    pub edges: Vec<DataFlowEdge>,
    /// Some edge passed a non-empty output into an empty input
    pub data_loss: bool,
    /// Some edge passed a non-empty output into a non-empty input sharing no keys
    pub data_corruption: bool,
}

/// Inspect every exited event immediately followed by an entered event
///
/// Adjacency is on the raw event list and state names need not match.
pub fn analyze_data_flow(events: &[ExecutionEvent]) -> DataFlowAnalysis {
    let mut edges = Vec::new();
    let mut data_loss = false;
    let mut data_corruption = false;

    for pair in events.windows(2) {
        let (
            EventKind::StateExited {
                name: from_state,
                output,
                ..
            },
            EventKind::StateEntered {
                name: to_state,
                input,
                ..
            },
        ) = (&pair[0].kind, &pair[1].kind)
        else {
            continue;
        };

        let output = parse_payload(output.as_deref());
        let input = parse_payload(input.as_deref());

        if !output.is_empty() && input.is_empty() && !data_loss {
            tracing::warn!(from = %from_state, to = %to_state, "Possible data loss between states");
            data_loss = true;
        }

        if !output.is_empty()
            && !input.is_empty()
            && !output.keys().any(|key| input.contains_key(key))
            && !data_corruption
        {
            tracing::warn!(from = %from_state, to = %to_state, "Possible data corruption between states");
            data_corruption = true;
        }

        edges.push(DataFlowEdge {
            from_state: from_state.clone(),
            to_state: to_state.clone(),
            transformation: Transformation { output, input },
            timestamp: pair[1].timestamp,
        });
    }

    DataFlowAnalysis {
        edges,
        data_loss,
        data_corruption,
    }
}
