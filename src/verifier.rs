//! Execution verification against a history source
//!
//! Each call fetches a fresh history for the execution it is given; nothing
//! is cached between calls. The wait helpers are boolean conditions over that
//! fetch, driven by [`wait_for_condition`].

use serde::Serialize;

use crate::analysis::{
    analyze_data_flow, analyze_performance, classify_execution, execution_status,
    get_state_output, verify_slas, verify_state_output, DataFlowAnalysis, ExecutionStatus,
    ExecutionSuccess, OutputVerification, Payload, PerformanceSummary, SlaThresholds,
    SlaVerificationResult, StateOutputRecord,
};
use crate::common::Result;
use crate::history::{EventKind, ExecutionEvent, HistorySource};
use crate::poller::{wait_for_condition, WaitOptions, WaitOutcome};

/// Every analysis of a single fetched history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution: String,
    pub status: ExecutionStatus,
    pub event_count: usize,
    pub performance: PerformanceSummary,
    pub success: ExecutionSuccess,
    pub data_flow: DataFlowAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<SlaVerificationResult>,
}

impl ExecutionReport {
    /// Run every analysis over `events`; SLAs are only checked when any limit is set
    pub fn build<S: AsRef<str>>(
        execution: &str,
        events: &[ExecutionEvent],
        expected_states: &[S],
        thresholds: &SlaThresholds,
    ) -> Self {
        let performance = analyze_performance(events);
        let sla = (!thresholds.is_empty()).then(|| verify_slas(&performance, thresholds));

        Self {
            execution: execution.to_string(),
            status: execution_status(events),
            event_count: events.len(),
            success: classify_execution(events, expected_states),
            data_flow: analyze_data_flow(events),
            performance,
            sla,
        }
    }
}

/// Verifies executions whose histories come from `S`
#[derive(Debug)]
pub struct ExecutionVerifier<S> {
    source: S,
    wait_options: WaitOptions,
}

impl<S: HistorySource> ExecutionVerifier<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            wait_options: WaitOptions::default(),
        }
    }

    /// Use `options` for waits that are not given their own
    pub fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.wait_options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn wait_options(&self) -> WaitOptions {
        self.wait_options
    }

    /// Fetch the history; source errors propagate unchanged
    pub async fn history(&self, execution_arn: &str) -> Result<Vec<ExecutionEvent>> {
        let events = self.source.get_history(execution_arn).await?;
        tracing::info!(execution = execution_arn, events = events.len(), "Fetched execution history");
        Ok(events)
    }

    pub async fn performance(&self, execution_arn: &str) -> Result<PerformanceSummary> {
        Ok(analyze_performance(&self.history(execution_arn).await?))
    }

    pub async fn state_outputs(
        &self,
        execution_arn: &str,
        state_name: Option<&str>,
    ) -> Result<Vec<StateOutputRecord>> {
        Ok(get_state_output(&self.history(execution_arn).await?, state_name))
    }

    pub async fn verify_state_output(
        &self,
        execution_arn: &str,
        state_name: &str,
        expected: &Payload,
    ) -> Result<OutputVerification> {
        Ok(verify_state_output(
            &self.history(execution_arn).await?,
            state_name,
            expected,
        ))
    }

    pub async fn data_flow(&self, execution_arn: &str) -> Result<DataFlowAnalysis> {
        Ok(analyze_data_flow(&self.history(execution_arn).await?))
    }

    pub async fn verify_slas(
        &self,
        execution_arn: &str,
        thresholds: &SlaThresholds,
    ) -> Result<SlaVerificationResult> {
        Ok(verify_slas(&self.performance(execution_arn).await?, thresholds))
    }

    pub async fn execution_success<T: AsRef<str>>(
        &self,
        execution_arn: &str,
        expected_states: &[T],
    ) -> Result<ExecutionSuccess> {
        Ok(classify_execution(
            &self.history(execution_arn).await?,
            expected_states,
        ))
    }

    /// Fetch once and run every analysis
    pub async fn report<T: AsRef<str>>(
        &self,
        execution_arn: &str,
        expected_states: &[T],
        thresholds: &SlaThresholds,
    ) -> Result<ExecutionReport> {
        let events = self.history(execution_arn).await?;
        Ok(ExecutionReport::build(
            execution_arn,
            &events,
            expected_states,
            thresholds,
        ))
    }

    /// Wait until the history contains a terminal execution event
    pub async fn wait_for_completion(
        &self,
        execution_arn: &str,
        options: Option<WaitOptions>,
    ) -> Result<WaitOutcome> {
        tracing::debug!(execution = execution_arn, "Waiting for execution to complete");
        wait_for_condition(
            || async move {
                let events = self.source.get_history(execution_arn).await?;
                Ok::<_, crate::common::Error>(execution_status(&events).is_terminal())
            },
            options.unwrap_or(self.wait_options),
        )
        .await
    }

    /// Wait until `state_name` has been entered
    pub async fn wait_for_state(
        &self,
        execution_arn: &str,
        state_name: &str,
        options: Option<WaitOptions>,
    ) -> Result<WaitOutcome> {
        tracing::debug!(execution = execution_arn, state = state_name, "Waiting for state");
        wait_for_condition(
            || async move {
                let events = self.source.get_history(execution_arn).await?;
                Ok::<_, crate::common::Error>(events.iter().any(|e| {
                    matches!(&e.kind, EventKind::StateEntered { name, .. } if name == state_name)
                }))
            },
            options.unwrap_or(self.wait_options),
        )
        .await
    }

    /// Wait until the execution classifies as successful
    pub async fn wait_for_success<T: AsRef<str>>(
        &self,
        execution_arn: &str,
        expected_states: &[T],
        options: Option<WaitOptions>,
    ) -> Result<WaitOutcome> {
        tracing::debug!(execution = execution_arn, "Waiting for execution success");
        wait_for_condition(
            || async move {
                let events = self.source.get_history(execution_arn).await?;
                Ok::<_, crate::common::Error>(classify_execution(&events, expected_states).success)
            },
            options.unwrap_or(self.wait_options),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::history::fixtures::{at, entered, exited};
    use crate::history::StaticHistorySource;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const ARN: &str = "arn:aws:states:us-east-1:123456789012:execution:orders:run-1";

    fn fast() -> WaitOptions {
        WaitOptions::new(Duration::from_millis(300), Duration::from_millis(10))
    }

    fn completed_history() -> Vec<ExecutionEvent> {
        vec![
            ExecutionEvent::execution_started(at(0)),
            entered(0, "Validate", r#"{"orderId":"o-1"}"#),
            exited(100, "Validate", r#"{"orderId":"o-1","valid":true}"#),
            entered(100, "Charge", r#"{"orderId":"o-1","valid":true}"#),
            exited(400, "Charge", r#"{"orderId":"o-1","charged":true}"#),
            ExecutionEvent::execution_succeeded(at(450)),
        ]
    }

    async fn verifier() -> ExecutionVerifier<StaticHistorySource> {
        let source = StaticHistorySource::new();
        source.insert(ARN, completed_history()).await;
        ExecutionVerifier::new(source).with_wait_options(fast())
    }

    #[tokio::test]
    async fn test_analyses_fetch_by_arn() {
        let verifier = verifier().await;

        let perf = verifier.performance(ARN).await.unwrap();
        assert_eq!(perf.total_execution_time_ms, 450);
        assert_eq!(perf.slowest_state.unwrap().name, "Charge");

        let success = verifier.execution_success(ARN, &["Validate", "Charge"]).await.unwrap();
        assert!(success.success);

        let flow = verifier.data_flow(ARN).await.unwrap();
        assert_eq!(flow.edges.len(), 1);
        assert!(!flow.data_loss);

        let outputs = verifier.state_outputs(ARN, Some("Charge")).await.unwrap();
        assert_eq!(outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_state_output() {
        let verifier = verifier().await;
        let expected = json!({"charged": true}).as_object().cloned().unwrap();

        let result = verifier.verify_state_output(ARN, "Charge", &expected).await.unwrap();
        assert!(result.matches);
        assert_eq!(result.extra_fields, vec!["orderId"]);
    }

    #[tokio::test]
    async fn test_verify_slas() {
        let verifier = verifier().await;
        let thresholds = SlaThresholds {
            max_state_execution_time_ms: Some(250),
            ..Default::default()
        };

        let result = verifier.verify_slas(ARN, &thresholds).await.unwrap();
        assert!(!result.meets_slas);
        assert_eq!(result.violations.len(), 1);
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let verifier = verifier().await;
        let err = verifier.performance("missing").await.unwrap_err();
        assert!(matches!(err, Error::HistorySource(_)));
    }

    #[tokio::test]
    async fn test_report_runs_everything_once() {
        let verifier = verifier().await;
        let report = verifier
            .report(ARN, &["Validate"], &SlaThresholds::default())
            .await
            .unwrap();

        assert_eq!(report.status, ExecutionStatus::Succeeded);
        assert_eq!(report.event_count, 6);
        assert!(report.success.success);
        assert!(report.sla.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_completion_sees_late_events() {
        let source = Arc::new(StaticHistorySource::new());
        source.insert(ARN, vec![ExecutionEvent::execution_started(at(0))]).await;

        let writer = Arc::clone(&source);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.push_event(ARN, entered(10, "A", "{}")).await;
            writer.push_event(ARN, exited(20, "A", "{}")).await;
            writer.push_event(ARN, ExecutionEvent::execution_succeeded(at(30))).await;
        });

        let verifier = ExecutionVerifier::new(source).with_wait_options(fast());
        let outcome = verifier.wait_for_completion(ARN, None).await.unwrap();
        assert!(outcome.attempts > 1);
    }

    #[tokio::test]
    async fn test_wait_swallows_missing_execution_until_timeout() {
        let verifier = ExecutionVerifier::new(StaticHistorySource::new()).with_wait_options(fast());

        let err = verifier.wait_for_completion("never", None).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_wait_for_state_and_success() {
        let verifier = verifier().await;

        verifier.wait_for_state(ARN, "Charge", None).await.unwrap();
        verifier
            .wait_for_success(ARN, &["Validate", "Charge"], None)
            .await
            .unwrap();

        let err = verifier
            .wait_for_state(ARN, "Refund", Some(fast().with_timeout(Duration::from_millis(50))))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConditionTimeout { timeout_ms: 50 }));
    }
}
