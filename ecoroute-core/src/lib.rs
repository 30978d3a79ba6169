//! Core domain types and planning logic for the eco-route engine.
//!
//! A planning run serves a set of delivery jobs from one depot with a small
//! fleet. Runs with a single job pick the lowest-emission route alternative
//! offered by the routing provider; runs with two or more jobs hand the
//! sequencing problem to a [`Sequencer`] implementation and translate the
//! visiting order back into per-arc [`Assignment`]s.
//!
//! The crate performs no I/O of its own. Routing data, environmental
//! coefficients, and persistence are supplied through the
//! [`RoutingProvider`], [`EnvironmentResolver`], and [`ResultSink`] traits.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod emission;
pub mod environment;
mod error;
pub mod matrix;
mod model;
pub mod planner;
pub mod report;
pub mod routing;
pub mod selector;
pub mod sequencer;
mod settings;
pub mod sink;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use emission::{EmissionModel, LegEmission, RouteEmission};
pub use environment::{
    CongestionFactors, EnvironmentResolver, EnvironmentalContext, FixedEnvironment,
    HourlyEnvironmentProfile,
};
pub use error::{ModelError, PlanError, RoutingError};
pub use matrix::RouteMatrix;
pub use model::{DAY_SECONDS, Job, Leg, Location, TimeWindow, Vehicle};
pub use planner::{PlanOutcome, PlanReport, PlanRequest, PlanStatus, Planner};
pub use report::{
    Assignment, BASELINE_ROUTE_NAME, Comparison, ECO_ROUTE_NAME, RouteResult, RunSummary,
};
pub use routing::{ProviderRoute, RouteCandidate, RouteLookup, RoutingProvider};
pub use selector::{ScoredCandidate, Selection};
pub use sequencer::{SequenceError, SequencedPlan, Sequencer, SequencingProblem, VehicleTour};
pub use settings::EngineSettings;
pub use sink::{MemorySink, PersistError, ResultSink};
