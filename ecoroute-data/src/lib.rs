//! Collaborator adapters for the eco-route engine.
//!
//! Responsibilities:
//! - Fetch routes and alternatives from an OSRM routing service.
//! - Persist run summaries and per-arc assignments to SQLite.
//! - Load hourly environment profiles from JSON files.
//!
//! Boundaries:
//! - Do not encode planning rules (those live in `ecoroute-core`).
//! - Keep blocking I/O off async executors; the routing provider bridges its
//!   async HTTP client to the synchronous core traits.
//!
//! Invariants:
//! - Every adapter is `Send + Sync` so the core can fan requests out across
//!   threads.
//! - No global mutable state.

pub mod environment;
pub mod routing;
pub mod store;

pub use environment::{EnvironmentLoadError, load_environment_profile, parse_environment_profile};
pub use routing::{OsrmRoutingConfig, OsrmRoutingProvider, ProviderBuildError};
pub use store::{SqliteResultSink, SqliteSinkError};
