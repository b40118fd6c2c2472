//! Execution and per-state timing

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{execution_bounds, pair_states};
use crate::history::ExecutionEvent;

/// A state occurrence and how long it ran
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDuration {
    pub name: String,
    pub duration_ms: i64,
}

/// Timing derived from one execution history
///
/// All durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    #[serde(rename = "totalExecutionTime")]
    pub total_execution_time_ms: i64,
    /// Keyed by state name; a repeated state reports its last occurrence
    #[serde(rename = "perStateDurations")]
    pub state_durations: BTreeMap<String, i64>,
    #[serde(rename = "slowestState")]
    pub slowest_state: Option<StateDuration>,
    #[serde(rename = "fastestState")]
    pub fastest_state: Option<StateDuration>,
    #[serde(rename = "averageStateExecutionTime")]
    pub average_state_execution_time_ms: f64,
}

/// Summarize timing, measuring a still-running execution up to now
pub fn analyze_performance(events: &[ExecutionEvent]) -> PerformanceSummary {
    analyze_performance_at(events, Utc::now())
}

/// Summarize timing, measuring a still-running execution up to `now`
///
/// Total time runs from ExecutionStarted to the first terminal event of any
/// outcome, or to `now` when the execution has not finished. It is 0 when
/// the execution has no start event.
/// Slowest, fastest and average consider every closed interval, including
/// repeated occurrences of the same state; ties go to the earliest interval.
pub fn analyze_performance_at(events: &[ExecutionEvent], now: DateTime<Utc>) -> PerformanceSummary {
    let bounds = execution_bounds(events);
    let total_execution_time_ms = match bounds.started {
        Some(start) => (bounds.finished.unwrap_or(now) - start).num_milliseconds().max(0),
        None => 0,
    };

    let intervals = pair_states(events);
    let mut state_durations = BTreeMap::new();
    let mut slowest: Option<StateDuration> = None;
    let mut fastest: Option<StateDuration> = None;
    let mut sum: i64 = 0;

    for interval in &intervals {
        let duration_ms = interval.duration_ms();
        sum += duration_ms;
        state_durations.insert(interval.state_name.clone(), duration_ms);

        if slowest.as_ref().map_or(true, |s| duration_ms > s.duration_ms) {
            slowest = Some(StateDuration {
                name: interval.state_name.clone(),
                duration_ms,
            });
        }
        if fastest.as_ref().map_or(true, |f| duration_ms < f.duration_ms) {
            fastest = Some(StateDuration {
                name: interval.state_name.clone(),
                duration_ms,
            });
        }
    }

    let average_state_execution_time_ms = if intervals.is_empty() {
        0.0
    } else {
        sum as f64 / intervals.len() as f64
    };

    PerformanceSummary {
        total_execution_time_ms,
        state_durations,
        slowest_state: slowest,
        fastest_state: fastest,
        average_state_execution_time_ms,
    }
}
