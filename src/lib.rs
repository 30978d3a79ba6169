//! Facade crate for the eco-route delivery planner.
//!
//! This crate re-exports the core domain types and exposes the `vrp-core`
//! sequencer and the OSRM, SQLite, and environment-profile adapters behind
//! feature flags.

#![forbid(unsafe_code)]

pub use ecoroute_core::{
    Assignment, Comparison, CongestionFactors, DAY_SECONDS, EmissionModel, EngineSettings,
    EnvironmentResolver, EnvironmentalContext, FixedEnvironment, HourlyEnvironmentProfile, Job,
    Leg, Location, MemorySink, ModelError, PersistError, PlanError, PlanOutcome, PlanReport,
    PlanRequest, PlanStatus, Planner, ProviderRoute, RouteCandidate, RouteLookup, RouteMatrix,
    ResultSink, RouteResult, RoutingError, RoutingProvider, RunSummary, SequenceError, Sequencer,
    TimeWindow, Vehicle,
};

#[cfg(feature = "solver-vrp")]
pub use ecoroute_solver_vrp::{VrpSequencer, VrpSequencerConfig};

#[cfg(feature = "store-sqlite")]
pub use ecoroute_data::{
    EnvironmentLoadError, OsrmRoutingConfig, OsrmRoutingProvider, ProviderBuildError,
    SqliteResultSink, SqliteSinkError, load_environment_profile,
};
