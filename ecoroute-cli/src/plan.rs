//! Plan command implementation for the eco-route CLI.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ecoroute_core::{
    EngineSettings, MemorySink, PlanOutcome, PlanStatus, Planner, ResultSink, RoutingProvider,
};
use ecoroute_data::{OsrmRoutingProvider, SqliteResultSink, load_environment_profile};
use ecoroute_solver_vrp::{VrpSequencer, VrpSequencerConfig};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

use crate::request::{load_request_document, load_settings};
use crate::{
    ARG_ENVIRONMENT_PROFILE, ARG_MAX_GENERATIONS, ARG_OSRM_BASE_URL, ARG_PLAN_REQUEST,
    ARG_RESULTS_DB, ARG_SEARCH_TIME_LIMIT, ARG_SETTINGS, CliError, ENV_PLAN_REQUEST,
};

pub(crate) const DEFAULT_OSRM_BASE_URL: &str = "http://localhost:5000";

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Plan a delivery run described by a JSON request. Routes \
                 come from an OSRM instance; the lowest-emission option and \
                 the provider's baseline are printed as JSON and, when a \
                 results database is given, stored in SQLite.",
    about = "Plan low-emission delivery routes"
)]
#[ortho_config(prefix = "ECOROUTE")]
pub(crate) struct PlanArgs {
    /// Path to a JSON file containing the plan request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Base URL for the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// SQLite database receiving run summaries and assignments.
    #[arg(long = ARG_RESULTS_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) results_db: Option<Utf8PathBuf>,
    /// JSON hourly congestion profile used when the request has no
    /// environment.
    #[arg(long = ARG_ENVIRONMENT_PROFILE, value_name = "path")]
    #[serde(default)]
    pub(crate) environment_profile: Option<Utf8PathBuf>,
    /// JSON engine settings; missing fields keep their defaults.
    #[arg(long = ARG_SETTINGS, value_name = "path")]
    #[serde(default)]
    pub(crate) settings: Option<Utf8PathBuf>,
    /// Multi-stop search budget in seconds.
    #[arg(long = ARG_SEARCH_TIME_LIMIT, value_name = "secs")]
    #[serde(default)]
    pub(crate) search_time_limit: Option<u64>,
    /// Upper bound on solver generations.
    #[arg(long = ARG_MAX_GENERATIONS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_generations: Option<usize>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) osrm_base_url: String,
    pub(crate) results_db: Option<Utf8PathBuf>,
    pub(crate) environment_profile: Option<Utf8PathBuf>,
    pub(crate) settings: Option<Utf8PathBuf>,
    pub(crate) search_time_limit: Option<Duration>,
    pub(crate) sequencer: VrpSequencerConfig,
}

impl PlanConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.request_path, ARG_PLAN_REQUEST)?;
        if let Some(path) = &self.settings {
            Self::require_existing(path, ARG_SETTINGS)?;
        }
        if let Some(path) = &self.environment_profile {
            Self::require_existing(path, ARG_ENVIRONMENT_PROFILE)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match crate::fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Settings file, if any, with the command-line budget applied on top.
    pub(crate) fn engine_settings(&self) -> Result<EngineSettings, CliError> {
        let settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => EngineSettings::default(),
        };
        Ok(match self.search_time_limit {
            Some(limit) => settings.with_search_time_limit(limit),
            None => settings,
        })
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_PLAN_REQUEST,
            env: ENV_PLAN_REQUEST,
        })?;
        let mut sequencer = VrpSequencerConfig::default();
        if let Some(max_generations) = args.max_generations {
            sequencer.max_generations = max_generations;
        }
        Ok(Self {
            request_path,
            osrm_base_url: args
                .osrm_base_url
                .unwrap_or_else(|| DEFAULT_OSRM_BASE_URL.to_owned()),
            results_db: args.results_db,
            environment_profile: args.environment_profile,
            settings: args.settings,
            search_time_limit: args.search_time_limit.map(Duration::from_secs),
            sequencer,
        })
    }
}

/// Builds the routing provider and result sink for one invocation.
pub(super) trait PlanBackends {
    fn routing(
        &self,
        config: &PlanConfig,
    ) -> Result<Box<dyn RoutingProvider + Send + Sync>, CliError>;

    /// SQLite when a results database is configured, otherwise memory.
    fn sink(&self, config: &PlanConfig) -> Result<Box<dyn ResultSink>, CliError> {
        match &config.results_db {
            Some(path) => SqliteResultSink::open(path)
                .map(|sink| Box::new(sink) as Box<dyn ResultSink>)
                .map_err(|err| CliError::OpenResultsDatabase(Box::new(err))),
            None => Ok(Box::new(MemorySink::default())),
        }
    }
}

pub(super) struct OsrmBackends;

impl PlanBackends for OsrmBackends {
    fn routing(
        &self,
        config: &PlanConfig,
    ) -> Result<Box<dyn RoutingProvider + Send + Sync>, CliError> {
        let provider = OsrmRoutingProvider::new(config.osrm_base_url.clone()).map_err(
            |source| CliError::BuildRoutingProvider {
                base_url: config.osrm_base_url.clone(),
                source,
            },
        )?;
        Ok(Box::new(provider))
    }
}

pub(super) fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_plan_with(args, &OsrmBackends, &mut stdout)
}

/// Plan, print the outcome, and turn a failed run into an error.
pub(super) fn run_plan_with(
    args: PlanArgs,
    backends: &dyn PlanBackends,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let outcome = execute_plan(args, backends)?;
    write_plan_outcome(writer, &outcome)?;
    if outcome.status == PlanStatus::Failed {
        return Err(CliError::PlanFailed {
            run_id: outcome.run_id,
            message: outcome.message.unwrap_or_default(),
        });
    }
    Ok(())
}

fn execute_plan(args: PlanArgs, backends: &dyn PlanBackends) -> Result<PlanOutcome, CliError> {
    let config = resolve_plan_config(args)?;
    let settings = config.engine_settings()?;
    let request = load_request_document(&config.request_path)?
        .into_plan_request(&settings)
        .map_err(|source| CliError::InvalidPlanRequest {
            path: config.request_path.clone(),
            source,
        })?;
    let profile = config
        .environment_profile
        .as_deref()
        .map(|path| load_environment_profile(path, &settings))
        .transpose()?;

    let provider = backends.routing(&config)?;
    let sink = backends.sink(&config)?;
    let sequencer = VrpSequencer::with_config(config.sequencer.clone());
    let planner = Planner::new(&*provider, sequencer, sink).with_settings(settings);
    let outcome = match profile {
        Some(profile) => planner.with_resolver(profile).plan(&request),
        None => planner.plan(&request),
    };
    Ok(outcome)
}

fn resolve_plan_config(args: PlanArgs) -> Result<PlanConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

fn write_plan_outcome(writer: &mut dyn Write, outcome: &PlanOutcome) -> Result<(), CliError> {
    let payload =
        serde_json::to_string_pretty(outcome).map_err(CliError::SerializePlanOutcome)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WritePlanOutput)?;
    writer.write_all(b"\n").map_err(CliError::WritePlanOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}
