//! sfn-verify - execution-history assertions for AWS Step Functions
//!
//! Reads execution histories and checks which states ran, how long they
//! took, what they produced and whether data survived between them.

use std::path::PathBuf;

use clap::Parser;
use sfn_verify::cli::{self, CliContext};
use sfn_verify::commands::Commands;
use sfn_verify::common::config::Config;
use sfn_verify::common::logging;

#[derive(Parser)]
#[command(name = "sfn-verify", about = "Step Functions execution verifier")]
#[command(version, long_about = None)]
struct Cli {
    /// Directory holding `<execution>.json` history files
    #[arg(long, global = true)]
    history_dir: Option<PathBuf>,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output and debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let ctx = CliContext {
        config,
        history_dir: cli.history_dir,
        json: cli.json,
        verbose: cli.verbose,
    };

    if let Err(e) = cli::dispatch(cli.command, &ctx).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
