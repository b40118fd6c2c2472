//! SLA threshold checks over a performance summary

use serde::{Deserialize, Serialize};

use super::PerformanceSummary;

/// Share of total execution time attributed to cold start
const COLD_START_RATIO: f64 = 0.1;

/// Caller-supplied limits in milliseconds; an absent limit is never checked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaThresholds {
    pub max_total_execution_time_ms: Option<u64>,
    pub max_state_execution_time_ms: Option<u64>,
    pub max_cold_start_time_ms: Option<u64>,
}

impl SlaThresholds {
    pub fn is_empty(&self) -> bool {
        self.max_total_execution_time_ms.is_none()
            && self.max_state_execution_time_ms.is_none()
            && self.max_cold_start_time_ms.is_none()
    }

    /// Fill limits missing here from `defaults`
    pub fn or(self, defaults: &SlaThresholds) -> Self {
        Self {
            max_total_execution_time_ms: self
                .max_total_execution_time_ms
                .or(defaults.max_total_execution_time_ms),
            max_state_execution_time_ms: self
                .max_state_execution_time_ms
                .or(defaults.max_state_execution_time_ms),
            max_cold_start_time_ms: self
                .max_cold_start_time_ms
                .or(defaults.max_cold_start_time_ms),
        }
    }
}

/// The metrics the thresholds were checked against
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaMetrics {
    pub total_execution_time: i64,
    pub slowest_state: Option<String>,
    pub slowest_state_time: i64,
    /// Estimated, not measured: 10% of total time when any state completed
    pub cold_start_time: f64,
    pub average_state_execution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaVerificationResult {
    pub meets_slas: bool,
    pub violations: Vec<String>,
    pub metrics: SlaMetrics,
}

/// Check each defined threshold against the summary
pub fn verify_slas(summary: &PerformanceSummary, thresholds: &SlaThresholds) -> SlaVerificationResult {
    let cold_start_time = if summary.slowest_state.is_some() {
        summary.total_execution_time_ms as f64 * COLD_START_RATIO
    } else {
        0.0
    };

    let metrics = SlaMetrics {
        total_execution_time: summary.total_execution_time_ms,
        slowest_state: summary.slowest_state.as_ref().map(|s| s.name.clone()),
        slowest_state_time: summary.slowest_state.as_ref().map_or(0, |s| s.duration_ms),
        cold_start_time,
        average_state_execution_time: summary.average_state_execution_time_ms,
    };

    let mut violations = Vec::new();

    if let Some(max) = thresholds.max_total_execution_time_ms {
        if exceeds(metrics.total_execution_time, max) {
            violations.push(format!(
                "Total execution time {}ms exceeds maximum of {}ms",
                metrics.total_execution_time, max
            ));
        }
    }

    if let (Some(max), Some(slowest)) = (
        thresholds.max_state_execution_time_ms,
        summary.slowest_state.as_ref(),
    ) {
        if exceeds(slowest.duration_ms, max) {
            violations.push(format!(
                "State '{}' execution time {}ms exceeds maximum of {}ms",
                slowest.name, slowest.duration_ms, max
            ));
        }
    }

    if let Some(max) = thresholds.max_cold_start_time_ms {
        if metrics.cold_start_time > max as f64 {
            violations.push(format!(
                "Estimated cold start time {}ms exceeds maximum of {}ms",
                metrics.cold_start_time, max
            ));
        }
    }

    for violation in &violations {
        tracing::debug!(%violation, "SLA violated");
    }

    SlaVerificationResult {
        meets_slas: violations.is_empty(),
        violations,
        metrics,
    }
}

fn exceeds(value_ms: i64, max_ms: u64) -> bool {
    u64::try_from(value_ms).map_or(false, |v| v > max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StateDuration;
    use std::collections::BTreeMap;

    fn summary(total: i64, slowest: Option<(&str, i64)>) -> PerformanceSummary {
        let slowest = slowest.map(|(name, duration_ms)| StateDuration {
            name: name.to_string(),
            duration_ms,
        });
        PerformanceSummary {
            total_execution_time_ms: total,
            state_durations: BTreeMap::new(),
            fastest_state: slowest.clone(),
            slowest_state: slowest,
            average_state_execution_time_ms: 0.0,
        }
    }

    #[test]
    fn test_total_time_violation() {
        let thresholds = SlaThresholds {
            max_total_execution_time_ms: Some(3000),
            ..Default::default()
        };

        let result = verify_slas(&summary(5000, None), &thresholds);
        assert!(!result.meets_slas);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].contains("5000"));
        assert!(result.violations[0].contains("3000"));
    }

    #[test]
    fn test_no_thresholds_always_meets() {
        let result = verify_slas(&summary(1_000_000, Some(("A", 999_999))), &SlaThresholds::default());
        assert!(result.meets_slas);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_state_time_uses_slowest_state() {
        let thresholds = SlaThresholds {
            max_state_execution_time_ms: Some(100),
            ..Default::default()
        };

        let result = verify_slas(&summary(500, Some(("Charge", 300))), &thresholds);
        assert!(!result.meets_slas);
        assert!(result.violations[0].contains("Charge"));
        assert!(result.violations[0].contains("300"));

        let result = verify_slas(&summary(500, None), &thresholds);
        assert!(result.meets_slas);
    }

    #[test]
    fn test_cold_start_is_estimated_from_total() {
        let thresholds = SlaThresholds {
            max_cold_start_time_ms: Some(400),
            ..Default::default()
        };

        let result = verify_slas(&summary(5000, Some(("A", 10))), &thresholds);
        assert_eq!(result.metrics.cold_start_time, 500.0);
        assert!(!result.meets_slas);

        // No completed state, no cold start estimate
        let result = verify_slas(&summary(5000, None), &thresholds);
        assert_eq!(result.metrics.cold_start_time, 0.0);
        assert!(result.meets_slas);
    }

    #[test]
    fn test_violations_are_ordered() {
        let thresholds = SlaThresholds {
            max_total_execution_time_ms: Some(1),
            max_state_execution_time_ms: Some(1),
            max_cold_start_time_ms: Some(1),
        };

        let result = verify_slas(&summary(5000, Some(("A", 4000))), &thresholds);
        assert_eq!(result.violations.len(), 3);
        assert!(result.violations[0].starts_with("Total"));
        assert!(result.violations[1].starts_with("State"));
        assert!(result.violations[2].starts_with("Estimated cold start"));
    }

    #[test]
    fn test_equal_to_threshold_is_not_a_violation() {
        let thresholds = SlaThresholds {
            max_total_execution_time_ms: Some(3000),
            ..Default::default()
        };
        assert!(verify_slas(&summary(3000, None), &thresholds).meets_slas);
    }

    #[test]
    fn test_defaults_fill_missing_limits() {
        let defaults = SlaThresholds {
            max_total_execution_time_ms: Some(10),
            max_cold_start_time_ms: Some(5),
            ..Default::default()
        };
        let merged = SlaThresholds {
            max_total_execution_time_ms: Some(99),
            ..Default::default()
        }
        .or(&defaults);

        assert_eq!(merged.max_total_execution_time_ms, Some(99));
        assert_eq!(merged.max_cold_start_time_ms, Some(5));
        assert!(merged.max_state_execution_time_ms.is_none());
    }
}
