//! Command-line interface for the truckify fleet core.
//!
//! `truckify plan` optimizes a JSON plan request offline. `truckify replay`
//! feeds recorded position reports through the live pipeline and prints what
//! a fleet-wide subscriber would have seen.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod plan;
mod replay;

pub use error::CliError;

use plan::{PlanArgs, run_plan};
use replay::{ReplayArgs, run_replay};

const ARG_PLAN_REQUEST: &str = "request";
const ARG_OSRM_BASE_URL: &str = "osrm-base-url";
const ARG_AVERAGE_SPEED_KMH: &str = "average-speed-kmh";
const ENV_PLAN_REQUEST: &str = "TRUCKIFY_CMDS_PLAN_REQUEST_PATH";

const ARG_REPLAY_SCENARIO: &str = "scenario";
const ARG_REPLAY_REPORTS: &str = "reports";
const ARG_DEBOUNCE_MS: &str = "debounce-ms";
const ARG_QUEUE_CAPACITY: &str = "queue-capacity";
const ARG_MAX_CORRIDOR_DISTANCE_M: &str = "max-corridor-distance-m";
const ARG_MAX_ETA_SLIP_SECS: &str = "max-eta-slip-secs";
const ENV_REPLAY_SCENARIO: &str = "TRUCKIFY_CMDS_REPLAY_SCENARIO_PATH";
const ENV_REPLAY_REPORTS: &str = "TRUCKIFY_CMDS_REPLAY_REPORTS_PATH";

/// Run the truckify CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] describing the first failure: argument parsing,
/// configuration layering, input loading, optimization or output.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Replay(args) => run_replay(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "truckify",
    about = "Plan delivery routes and replay fleet telemetry",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Optimize a plan request and print the resulting plan.
    Plan(PlanArgs),
    /// Replay recorded position reports through the live pipeline.
    Replay(ReplayArgs),
}

#[cfg(test)]
mod tests;
