//! Test runner implementation
//!
//! Executes test scenarios against a single fetched execution history,
//! asserting on structured analysis results rather than rendered output.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::analysis::{
    analyze_data_flow, analyze_performance, classify_execution, state_order, verify_slas,
    verify_state_output,
};
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::history::{ExecutionEvent, FileHistorySource};
use crate::verifier::ExecutionVerifier;

use super::config::{TestScenario, TestStep, WaitConfig};

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, config: &Config, verbose: bool) -> Result<TestResult> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    let scenario: TestScenario = serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))?;

    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );

    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    // Histories and history files resolve relative to the scenario file
    let scenario_dir = path.parent().unwrap_or(Path::new("."));
    let history_dir = match &scenario.history_dir {
        Some(dir) => paths::resolve_relative(scenario_dir, dir),
        None => config.history.dir.clone(),
    };
    let execution = {
        let local = scenario_dir.join(&scenario.execution);
        if local.is_file() {
            local.to_string_lossy().into_owned()
        } else {
            scenario.execution.clone()
        }
    };

    if verbose {
        println!("  Execution: {}", execution.dimmed());
        println!("  History dir: {}", history_dir.display().to_string().dimmed());
    }

    let verifier = ExecutionVerifier::new(FileHistorySource::new(history_dir))
        .with_wait_options(config.poller.wait_options());

    if let Some(wait) = &scenario.wait {
        let options = wait_options(wait, config);
        println!("\n{}", "Waiting for execution to complete...".cyan());

        match verifier.wait_for_completion(&execution, Some(options)).await {
            Ok(outcome) => {
                println!(
                    "  {} Completed after {} poll(s)",
                    "✓".green(),
                    outcome.attempts
                );
            }
            Err(e) if e.is_timeout() => {
                println!("  {} {}", "✗".red(), e);
                return Ok(TestResult {
                    name: scenario.name,
                    passed: false,
                    steps_run: 0,
                    steps_total,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let events = verifier.history(&execution).await?;

    println!("\n{}", "Steps:".cyan());

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        match execute_step(&events, step) {
            Ok(detail) => {
                println!(
                    "  {} Step {}: {}{}",
                    "✓".green(),
                    step_num,
                    step.label(),
                    if verbose && !detail.is_empty() {
                        format!(" {}", detail.dimmed())
                    } else {
                        String::new()
                    }
                );
            }
            Err(e) => {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);

                return Ok(TestResult {
                    name: scenario.name,
                    passed: false,
                    steps_run: step_num,
                    steps_total,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    );

    Ok(TestResult {
        name: scenario.name,
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
    })
}

fn wait_options(wait: &WaitConfig, config: &Config) -> crate::poller::WaitOptions {
    let mut options = config.poller.wait_options();
    if let Some(ms) = wait.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = wait.interval_ms {
        options = options.with_interval(Duration::from_millis(ms));
    }
    options
}

/// Check one step against the history, returning a short detail on success
fn execute_step(events: &[ExecutionEvent], step: &TestStep) -> Result<String> {
    match step {
        TestStep::ExpectSuccess { states } => {
            let result = classify_execution(events, states.as_slice());
            if !result.failed_states.is_empty() {
                return Err(Error::TestAssertion(format!(
                    "Expected success, but states failed: {:?}",
                    result.failed_states
                )));
            }
            let missing: Vec<&String> = states
                .iter()
                .filter(|s| !result.completed_states.contains(s))
                .collect();
            if !missing.is_empty() {
                return Err(Error::TestAssertion(format!(
                    "Expected states never ran: {:?}. Ran: {:?}",
                    missing, result.completed_states
                )));
            }
            Ok(format!("({} ms)", result.execution_time_ms))
        }

        TestStep::ExpectFailure { states } => {
            let result = classify_execution(events, states.as_slice());
            if result.failed_states.is_empty() {
                return Err(Error::TestAssertion(
                    "Expected a failed state, but none failed".to_string(),
                ));
            }
            let not_failed: Vec<&String> = states
                .iter()
                .filter(|s| !result.failed_states.contains(s))
                .collect();
            if !not_failed.is_empty() {
                return Err(Error::TestAssertion(format!(
                    "Expected states to fail: {:?}. Failed: {:?}",
                    not_failed, result.failed_states
                )));
            }
            Ok(format!("{:?}", result.failed_states))
        }

        TestStep::ExpectOrder { states } => {
            let order = state_order(events);
            if !is_subsequence(&order, states) {
                return Err(Error::TestAssertion(format!(
                    "Expected states in order {:?}, got {:?}",
                    states, order
                )));
            }
            Ok(String::new())
        }

        TestStep::ExpectOutput { state, output } => {
            let result = verify_state_output(events, state, output);
            if !result.matches {
                return Err(Error::TestAssertion(format!(
                    "State '{}': fields {:?} missing or different. Actual output: {}",
                    state,
                    result.missing_fields,
                    serde_json::Value::Object(result.actual_output)
                )));
            }
            Ok(if result.extra_fields.is_empty() {
                String::new()
            } else {
                format!("(extra fields: {})", result.extra_fields.join(", "))
            })
        }

        TestStep::ExpectSla { .. } => {
            let thresholds = step.sla_thresholds().unwrap_or_default();
            let result = verify_slas(&analyze_performance(events), &thresholds);
            if !result.meets_slas {
                return Err(Error::TestAssertion(result.violations.join("; ")));
            }
            Ok(format!("(total {} ms)", result.metrics.total_execution_time))
        }

        TestStep::ExpectDataFlow {
            data_loss,
            data_corruption,
        } => {
            let analysis = analyze_data_flow(events);
            if let Some(expected) = data_loss {
                if analysis.data_loss != *expected {
                    return Err(Error::TestAssertion(format!(
                        "Expected data_loss={}, got data_loss={}",
                        expected, analysis.data_loss
                    )));
                }
            }
            if let Some(expected) = data_corruption {
                if analysis.data_corruption != *expected {
                    return Err(Error::TestAssertion(format!(
                        "Expected data_corruption={}, got data_corruption={}",
                        expected, analysis.data_corruption
                    )));
                }
            }
            Ok(format!("({} edges)", analysis.edges.len()))
        }
    }
}

/// Whether `expected` appears in `actual` in order, possibly with gaps
fn is_subsequence(actual: &[&str], expected: &[String]) -> bool {
    let mut remaining = actual.iter();
    expected
        .iter()
        .all(|want| remaining.any(|got| *got == want.as_str()))
}
