//! CLI command definitions
//!
//! Defines the clap commands for the sfn-verify CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an execution: status, timing, success and data flow
    Analyze {
        /// Execution ARN or path to a history file
        execution: String,

        /// State expected to have run (can be given multiple times)
        #[arg(long = "expect-state", short = 'e')]
        expected_states: Vec<String>,
    },

    /// Show state inputs and outputs
    Outputs {
        /// Execution ARN or path to a history file
        execution: String,

        /// Only show this state
        #[arg(long)]
        state: Option<String>,
    },

    /// Check that a state's output contains the expected fields
    VerifyOutput {
        /// Execution ARN or path to a history file
        execution: String,

        /// State whose output is checked
        #[arg(long)]
        state: String,

        /// Expected fields as a JSON object, e.g. '{"status":"OK"}'
        #[arg(long)]
        expected: String,
    },

    /// Check execution timing against SLA thresholds
    Sla {
        /// Execution ARN or path to a history file
        execution: String,

        /// Maximum total execution time in milliseconds
        #[arg(long)]
        max_total_ms: Option<u64>,

        /// Maximum time for any single state in milliseconds
        #[arg(long)]
        max_state_ms: Option<u64>,

        /// Maximum estimated cold start time in milliseconds
        #[arg(long)]
        max_cold_start_ms: Option<u64>,
    },

    /// Wait for an execution to complete (or a state to be entered)
    Wait {
        /// Execution ARN or path to a history file
        execution: String,

        /// Wait for this state to be entered instead of completion
        #[arg(long)]
        state: Option<String>,

        /// Timeout in milliseconds (default from config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Poll interval in milliseconds (default from config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Run YAML test scenarios
    Test {
        /// Scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },
}
