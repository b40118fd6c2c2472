//! Library-level tests over the recorded histories in `tests/fixtures`

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use sfn_verify::analysis::{ExecutionStatus, SlaThresholds};
use sfn_verify::history::{FileHistorySource, StaticHistorySource};
use sfn_verify::{Error, ExecutionEvent, ExecutionVerifier, WaitOptions};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn fixture_verifier() -> ExecutionVerifier<FileHistorySource> {
    ExecutionVerifier::new(FileHistorySource::new(fixtures_dir()))
}

fn object(value: serde_json::Value) -> sfn_verify::analysis::Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

#[tokio::test]
async fn test_order_pipeline_report() {
    let verifier = fixture_verifier();
    let report = verifier
        .report(
            "order_pipeline",
            &["ValidateOrder", "ChargeCard", "SendReceipt"],
            &SlaThresholds::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.status, ExecutionStatus::Succeeded);
    assert_eq!(report.event_count, 8);

    let perf = &report.performance;
    assert_eq!(perf.total_execution_time_ms, 600);
    assert_eq!(perf.state_durations["ValidateOrder"], 100);
    assert_eq!(perf.state_durations["ChargeCard"], 400);
    assert_eq!(perf.state_durations["SendReceipt"], 50);
    assert_eq!(perf.slowest_state.as_ref().unwrap().name, "ChargeCard");
    assert_eq!(perf.fastest_state.as_ref().unwrap().name, "SendReceipt");
    assert!((perf.average_state_execution_time_ms - 550.0 / 3.0).abs() < 1e-9);

    assert!(report.success.success);
    assert_eq!(report.success.execution_time_ms, 600);
    assert!(report.success.failed_states.is_empty());

    assert_eq!(report.data_flow.edges.len(), 2);
    assert!(!report.data_flow.data_loss);
    assert!(!report.data_flow.data_corruption);

    // No thresholds configured
    assert!(report.sla.is_none());
}

#[tokio::test]
async fn test_order_pipeline_outputs() {
    let verifier = fixture_verifier();

    let records = verifier
        .state_outputs("order_pipeline", Some("ChargeCard"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, "TaskStateEntered");
    assert_eq!(records[0].input["valid"], json!(true));
    assert_eq!(records[0].output.as_ref().unwrap()["chargeId"], json!("ch-1"));

    let all = verifier.state_outputs("order_pipeline", None).await.unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.state_name.as_str()).collect();
    assert_eq!(names, ["ValidateOrder", "ChargeCard", "SendReceipt"]);

    let ok = verifier
        .verify_state_output(
            "order_pipeline",
            "SendReceipt",
            &object(json!({"status": "COMPLETE"})),
        )
        .await
        .unwrap();
    assert!(ok.matches);
    assert_eq!(ok.extra_fields, ["orderId"]);

    let wrong = verifier
        .verify_state_output(
            "order_pipeline",
            "SendReceipt",
            &object(json!({"status": "PENDING", "trackingId": "t-1"})),
        )
        .await
        .unwrap();
    assert!(!wrong.matches);
    assert_eq!(wrong.missing_fields, ["status", "trackingId"]);
}

#[tokio::test]
async fn test_order_pipeline_slas() {
    let verifier = fixture_verifier();

    let within = SlaThresholds {
        max_total_execution_time_ms: Some(1000),
        max_state_execution_time_ms: Some(500),
        max_cold_start_time_ms: Some(100),
    };
    let result = verifier.verify_slas("order_pipeline", &within).await.unwrap();
    assert!(result.meets_slas, "violations: {:?}", result.violations);
    assert_eq!(result.metrics.slowest_state.as_deref(), Some("ChargeCard"));
    assert!((result.metrics.cold_start_time - 60.0).abs() < 1e-9);

    let tight = SlaThresholds {
        max_total_execution_time_ms: Some(500),
        max_state_execution_time_ms: Some(300),
        max_cold_start_time_ms: Some(50),
    };
    let result = verifier.verify_slas("order_pipeline", &tight).await.unwrap();
    assert!(!result.meets_slas);
    assert_eq!(result.violations.len(), 3);
    assert_eq!(
        result.violations[0],
        "Total execution time 600ms exceeds maximum of 500ms"
    );
    assert!(result.violations[1].starts_with("State 'ChargeCard'"));
}

#[tokio::test]
async fn test_failed_charge_classification() {
    let verifier = fixture_verifier();

    let success = verifier
        .execution_success("failed_charge", &["ValidateOrder"])
        .await
        .unwrap();
    assert!(!success.success);
    assert_eq!(success.failed_states, ["ChargeCard"]);
    // ChargeCard was entered, so it still counts as completed
    assert_eq!(success.completed_states, ["ValidateOrder", "ChargeCard"]);
    // No ExecutionSucceeded event
    assert_eq!(success.execution_time_ms, 0);

    let events = verifier.history("failed_charge").await.unwrap();
    assert_eq!(
        sfn_verify::analysis::execution_status(&events),
        ExecutionStatus::Failed
    );

    let perf = verifier.performance("failed_charge").await.unwrap();
    // Measured up to ExecutionFailed, not the wall clock
    assert_eq!(perf.total_execution_time_ms, 310);
    // ChargeCard never exited
    assert_eq!(perf.state_durations.len(), 1);
    assert!(perf.state_durations.contains_key("ValidateOrder"));
}

#[tokio::test]
async fn test_lossy_transform_flags_data_flow() {
    let analysis = fixture_verifier().data_flow("lossy_transform").await.unwrap();

    assert_eq!(analysis.edges.len(), 2);
    assert_eq!(analysis.edges[0].from_state, "Extract");
    assert_eq!(analysis.edges[0].to_state, "Load");
    assert!(analysis.edges[0].transformation.input.is_empty());
    assert_eq!(analysis.edges[1].to_state, "Notify");

    assert!(analysis.data_loss);
    assert!(analysis.data_corruption);
}

#[tokio::test]
async fn test_arn_resolves_to_sanitized_file() {
    let dir = tempfile::tempdir().unwrap();
    let arn = "arn:aws:states:us-east-1:123456789012:execution:Orders:run-1";
    std::fs::copy(
        fixtures_dir().join("order_pipeline.json"),
        dir.path()
            .join("arn_aws_states_us-east-1_123456789012_execution_Orders_run-1.json"),
    )
    .unwrap();

    let verifier = ExecutionVerifier::new(FileHistorySource::new(dir.path()));
    let events = verifier.history(arn).await.unwrap();
    assert_eq!(events.len(), 8);

    let missing = verifier.history("arn:aws:states:eu-west-1:1:execution:X:y").await;
    assert!(matches!(missing, Err(Error::HistoryNotFound { .. })));
}

#[tokio::test]
async fn test_wait_for_state_sees_late_events() {
    let source = std::sync::Arc::new(StaticHistorySource::new());
    let arn = "arn:aws:states:us-east-1:1:execution:Orders:late";
    let verifier = ExecutionVerifier::new(source.clone()).with_wait_options(WaitOptions::new(
        Duration::from_secs(5),
        Duration::from_millis(20),
    ));

    let writer = {
        let source = source.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let start = chrono::Utc::now();
            source
                .insert(arn, vec![ExecutionEvent::execution_started(start)])
                .await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            source
                .push_event(
                    arn,
                    ExecutionEvent::state_entered(chrono::Utc::now(), "Ship", Some("{}")),
                )
                .await;
        })
    };

    let outcome = verifier.wait_for_state(arn, "Ship", None).await.unwrap();
    assert!(outcome.attempts > 1);
    writer.await.unwrap();

    let timeout = verifier
        .wait_for_completion(
            arn,
            Some(WaitOptions::new(
                Duration::from_millis(100),
                Duration::from_millis(20),
            )),
        )
        .await;
    assert!(matches!(
        timeout,
        Err(Error::ConditionTimeout { timeout_ms: 100 })
    ));
}
