//! Error types shared across the core.

use thiserror::Error;

use crate::sequencer::SequenceError;

/// Validation failures for domain records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Coordinates were not finite or fell outside the globe.
    #[error("location ({latitude}, {longitude}) is not a valid WGS84 position")]
    InvalidLocation {
        /// Offending latitude.
        latitude: f64,
        /// Offending longitude.
        longitude: f64,
    },
    /// A job asked for a negative or non-finite quantity.
    #[error("job {job_id} has invalid demand {demand_kg} kg")]
    NegativeDemand {
        /// Job identifier.
        job_id: String,
        /// Offending demand.
        demand_kg: f64,
    },
    /// A vehicle rate or capacity was negative or non-finite.
    #[error("vehicle {vehicle_id} has invalid {field} {value}")]
    InvalidVehicle {
        /// Vehicle identifier.
        vehicle_id: String,
        /// Name of the offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A time window closed before it opened.
    #[error("time window [{start}, {end}] ends before it starts")]
    InvertedTimeWindow {
        /// Window start offset.
        start: u32,
        /// Window end offset.
        end: u32,
    },
    /// An environmental coefficient was outside its allowed range.
    #[error("environment coefficient {field} must be {expected}, got {value}")]
    InvalidEnvironment {
        /// Name of the offending coefficient.
        field: &'static str,
        /// Human-readable allowed range.
        expected: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Failures reported by a [`crate::RoutingProvider`].
///
/// A pair of locations with no route between them is not an error; providers
/// report it as [`crate::RouteLookup::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    HttpError {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Requested URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The service reported an application-level error.
    #[error("routing service error {code}: {message}")]
    ServiceError {
        /// Service error code.
        code: String,
        /// Error detail.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Decoder error detail.
        message: String,
    },
}

/// Run-scoped planning failures.
///
/// Every variant maps to status `failed` in a [`crate::PlanOutcome`];
/// persistence problems are reported separately as a warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Depot, jobs, or vehicles were missing.
    #[error("incomplete input: {what}")]
    InputIncomplete {
        /// Which part of the input was missing.
        what: &'static str,
    },
    /// A job, vehicle, or environment value failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ModelError),
    /// The routing provider produced no usable data.
    #[error("routing provider unavailable: {message}")]
    ProviderUnavailable {
        /// What could not be routed.
        message: String,
    },
    /// Every candidate or solution missed a delivery window.
    #[error("time windows cannot be met: {message}")]
    TimeWindowInfeasible {
        /// Which window was missed.
        message: String,
    },
    /// A vehicle would have to carry more than its capacity.
    #[error("vehicle {vehicle_id} would carry {load_kg} kg over its {capacity_kg} kg capacity")]
    CapacityExceeded {
        /// Vehicle identifier.
        vehicle_id: String,
        /// Load the vehicle would start with.
        load_kg: f64,
        /// Vehicle capacity.
        capacity_kg: f64,
    },
    /// The sequencer could not produce a feasible plan.
    #[error("no feasible solution: {message}")]
    NoSolution {
        /// Sequencer detail.
        message: String,
    },
}

impl From<SequenceError> for PlanError {
    fn from(error: SequenceError) -> Self {
        match error {
            SequenceError::NoSolution { message } => Self::NoSolution { message },
            SequenceError::TimeWindowInfeasible { message } => {
                Self::TimeWindowInfeasible { message }
            }
            SequenceError::Model { message } => Self::NoSolution {
                message: format!("model construction failed: {message}"),
            },
        }
    }
}
