//! CLI command handling
//!
//! Dispatches CLI commands to the verifier and formats output.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::analysis::{
    DataFlowAnalysis, OutputVerification, Payload, PerformanceSummary, SlaThresholds,
    SlaVerificationResult, StateOutputRecord,
};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::history::FileHistorySource;
use crate::testing;
use crate::verifier::{ExecutionReport, ExecutionVerifier};

/// Settings shared by every command
#[derive(Debug)]
pub struct CliContext {
    pub config: Config,
    /// Overrides `config.history.dir`
    pub history_dir: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

impl CliContext {
    fn verifier(&self) -> ExecutionVerifier<FileHistorySource> {
        let dir = self
            .history_dir
            .clone()
            .unwrap_or_else(|| self.config.history.dir.clone());
        ExecutionVerifier::new(FileHistorySource::new(dir))
            .with_wait_options(self.config.poller.wait_options())
    }
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, ctx: &CliContext) -> Result<()> {
    match command {
        Commands::Analyze {
            execution,
            expected_states,
        } => {
            let report = ctx
                .verifier()
                .report(&execution, &expected_states, &ctx.config.sla)
                .await?;

            if ctx.json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }

            if !report.success.success {
                return Err(Error::TestAssertion(format!(
                    "Execution '{}' did not succeed",
                    execution
                )));
            }
            Ok(())
        }

        Commands::Outputs { execution, state } => {
            let records = ctx
                .verifier()
                .state_outputs(&execution, state.as_deref())
                .await?;

            if ctx.json {
                print_json(&records)?;
            } else if records.is_empty() {
                println!("No matching states entered");
            } else {
                for record in &records {
                    print_output_record(record);
                }
            }
            Ok(())
        }

        Commands::VerifyOutput {
            execution,
            state,
            expected,
        } => {
            let expected = parse_expected(&expected)?;
            let result = ctx
                .verifier()
                .verify_state_output(&execution, &state, &expected)
                .await?;

            if ctx.json {
                print_json(&result)?;
            } else {
                print_output_verification(&state, &result);
            }

            if !result.matches {
                return Err(Error::TestAssertion(format!(
                    "Output of state '{}' is missing fields: {}",
                    state,
                    result.missing_fields.join(", ")
                )));
            }
            Ok(())
        }

        Commands::Sla {
            execution,
            max_total_ms,
            max_state_ms,
            max_cold_start_ms,
        } => {
            let thresholds = SlaThresholds {
                max_total_execution_time_ms: max_total_ms,
                max_state_execution_time_ms: max_state_ms,
                max_cold_start_time_ms: max_cold_start_ms,
            }
            .or(&ctx.config.sla);

            if thresholds.is_empty() {
                tracing::warn!("No SLA thresholds given; every execution meets them");
            }

            let result = ctx.verifier().verify_slas(&execution, &thresholds).await?;

            if ctx.json {
                print_json(&result)?;
            } else {
                print_sla(&result);
            }

            if !result.meets_slas {
                return Err(Error::TestAssertion(format!(
                    "{} SLA violation(s)",
                    result.violations.len()
                )));
            }
            Ok(())
        }

        Commands::Wait {
            execution,
            state,
            timeout_ms,
            interval_ms,
        } => {
            let mut options = ctx.config.poller.wait_options();
            if let Some(ms) = timeout_ms {
                options = options.with_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = interval_ms {
                options = options.with_interval(Duration::from_millis(ms));
            }

            let verifier = ctx.verifier();
            let outcome = match &state {
                Some(state) => verifier.wait_for_state(&execution, state, Some(options)).await?,
                None => verifier.wait_for_completion(&execution, Some(options)).await?,
            };

            match state {
                Some(state) => println!(
                    "State '{}' entered ({} poll(s), {} ms)",
                    state,
                    outcome.attempts,
                    outcome.elapsed.as_millis()
                ),
                None => println!(
                    "Execution complete ({} poll(s), {} ms)",
                    outcome.attempts,
                    outcome.elapsed.as_millis()
                ),
            }
            Ok(())
        }

        Commands::Test { scenarios } => {
            let mut config = ctx.config.clone();
            if let Some(dir) = &ctx.history_dir {
                config.history.dir = dir.clone();
            }
            let mut failed = Vec::new();

            for path in &scenarios {
                let result = testing::run_scenario(path, &config, ctx.verbose).await?;
                if !result.passed {
                    failed.push(result.name);
                }
            }

            println!(
                "{} of {} scenario(s) passed",
                scenarios.len() - failed.len(),
                scenarios.len()
            );

            if !failed.is_empty() {
                return Err(Error::TestAssertion(format!(
                    "Failed scenarios: {}",
                    failed.join(", ")
                )));
            }
            Ok(())
        }
    }
}

/// Parse the `--expected` argument, which must be a JSON object
fn parse_expected(raw: &str) -> Result<Payload> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::InvalidArgument(
            "--expected must be a JSON object".to_string(),
        )),
        Err(e) => Err(Error::InvalidArgument(format!(
            "--expected is not valid JSON: {}",
            e
        ))),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &ExecutionReport) {
    println!("Execution: {}", report.execution);
    println!("Status:    {} ({} events)", report.status, report.event_count);
    println!();
    print_performance(&report.performance);
    println!();

    let success = &report.success;
    println!(
        "Success:   {}",
        if success.success { "yes" } else { "no" }
    );
    println!("  Ran:     {}", success.completed_states.join(" → "));
    if !success.failed_states.is_empty() {
        println!("  Failed:  {}", success.failed_states.join(", "));
    }
    println!();

    print_data_flow(&report.data_flow);

    if let Some(sla) = &report.sla {
        println!();
        print_sla(sla);
    }
}

fn print_performance(perf: &PerformanceSummary) {
    println!("Total time: {} ms", perf.total_execution_time_ms);
    if perf.state_durations.is_empty() {
        println!("  No completed states");
        return;
    }
    for (name, ms) in &perf.state_durations {
        println!("  {:<30} {:>8} ms", name, ms);
    }
    if let Some(slowest) = &perf.slowest_state {
        println!("  Slowest: {} ({} ms)", slowest.name, slowest.duration_ms);
    }
    if let Some(fastest) = &perf.fastest_state {
        println!("  Fastest: {} ({} ms)", fastest.name, fastest.duration_ms);
    }
    println!("  Average: {:.1} ms", perf.average_state_execution_time_ms);
}

fn print_data_flow(flow: &DataFlowAnalysis) {
    println!(
        "Data flow: {} edge(s), data loss: {}, data corruption: {}",
        flow.edges.len(),
        flow.data_loss,
        flow.data_corruption
    );
    for edge in &flow.edges {
        println!(
            "  {} → {} ({} key(s) out, {} key(s) in)",
            edge.from_state,
            edge.to_state,
            edge.transformation.output.len(),
            edge.transformation.input.len()
        );
    }
}

fn print_output_record(record: &StateOutputRecord) {
    println!(
        "{} [{}] at {}",
        record.state_name,
        record.event_type,
        record.timestamp.to_rfc3339()
    );
    println!("  input:  {}", serde_json::Value::Object(record.input.clone()));
    match &record.output {
        Some(output) => println!("  output: {}", serde_json::Value::Object(output.clone())),
        None => println!("  output: (state has not exited)"),
    }
}

fn print_output_verification(state: &str, result: &OutputVerification) {
    if result.matches {
        println!("Output of '{}' matches", state);
    } else {
        println!("Output of '{}' does not match", state);
        println!("  Missing or different: {}", result.missing_fields.join(", "));
    }
    if !result.extra_fields.is_empty() {
        println!("  Extra fields: {}", result.extra_fields.join(", "));
    }
    println!(
        "  Actual: {}",
        serde_json::Value::Object(result.actual_output.clone())
    );
}

fn print_sla(result: &SlaVerificationResult) {
    if result.meets_slas {
        println!("SLAs met");
    } else {
        println!("SLA violations:");
        for violation in &result.violations {
            println!("  - {}", violation);
        }
    }
    println!(
        "  total {} ms, slowest state {} ms, estimated cold start {:.0} ms",
        result.metrics.total_execution_time,
        result.metrics.slowest_state_time,
        result.metrics.cold_start_time
    );
}
