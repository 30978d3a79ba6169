//! Command-line interface for planning eco delivery runs.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod plan;
mod request;

pub use error::CliError;
use plan::PlanArgs;

pub(crate) const ARG_PLAN_REQUEST: &str = "request";
pub(crate) const ARG_OSRM_BASE_URL: &str = "osrm-base-url";
pub(crate) const ARG_RESULTS_DB: &str = "results-db";
pub(crate) const ARG_ENVIRONMENT_PROFILE: &str = "environment-profile";
pub(crate) const ARG_SETTINGS: &str = "settings";
pub(crate) const ARG_SEARCH_TIME_LIMIT: &str = "search-time-limit";
pub(crate) const ARG_MAX_GENERATIONS: &str = "max-generations";
pub(crate) const ENV_PLAN_REQUEST: &str = "ECOROUTE_CMDS_PLAN_REQUEST_PATH";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when arguments or configuration are invalid, an
/// input cannot be read, or the run fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Plan(args) => plan::run_plan(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ecoroute",
    about = "Plan low-emission delivery routes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan a delivery run described by a JSON request.
    Plan(PlanArgs),
}

#[cfg(test)]
mod tests;
