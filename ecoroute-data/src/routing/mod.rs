//! HTTP routing provider backed by OSRM.
//!
//! [`OsrmRoutingProvider`] implements [`ecoroute_core::RoutingProvider`]
//! against the OSRM Route service. Both trait methods are synchronous; the
//! provider blocks on its async HTTP client internally so the core stays
//! embeddable in synchronous programs.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ecoroute_core::{Location, RoutingProvider};
//! use ecoroute_data::routing::{OsrmRoutingConfig, OsrmRoutingProvider};
//!
//! let config = OsrmRoutingConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("depot-planner/1.0");
//! let provider = OsrmRoutingProvider::with_config(config)?;
//!
//! let gunsan = Location::new(35.94, 126.68)?;
//! let busan = Location::new(35.09, 128.82)?;
//! for candidate in provider.route_alternatives(gunsan, busan)? {
//!     println!("{}: {:.1} km", candidate.label, candidate.route.total_distance_km);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod osrm;
mod provider;

pub use provider::{
    DEFAULT_USER_AGENT, OsrmRoutingConfig, OsrmRoutingProvider, PROVIDER_NAME, ProviderBuildError,
};
