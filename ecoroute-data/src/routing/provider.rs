//! `RoutingProvider` using OSRM's Route API.
//!
//! The [`RoutingProvider`] trait is synchronous, so this provider bridges
//! the async HTTP client by blocking on a Tokio runtime it owns.

use std::time::Duration;

use ecoroute_core::{
    Leg, Location, ProviderRoute, RouteCandidate, RouteLookup, RoutingError, RoutingProvider,
};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::osrm::{OsrmRoute, RouteResponse};

/// Error type for [`OsrmRoutingProvider`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "ecoroute-routing/0.1";

/// Provider name reported on every [`RouteCandidate`].
pub const PROVIDER_NAME: &str = "osrm";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest response excerpt quoted in an HTTP error.
const ERROR_BODY_EXCERPT: usize = 200;

/// Configuration for [`OsrmRoutingProvider`].
#[derive(Debug, Clone)]
pub struct OsrmRoutingConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// OSRM profile segment of the URL.
    pub profile: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OsrmRoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            profile: "driving".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsrmRoutingConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the OSRM profile (`driving` by default).
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP routing provider using the OSRM Route API.
///
/// # Runtime behaviour
///
/// When called from outside any Tokio runtime, the provider uses its own
/// multi-threaded runtime, so the route matrix can issue requests from
/// several threads at once. When called from within an existing
/// multi-threaded Tokio runtime, it uses that runtime's handle with
/// [`tokio::task::block_in_place`] to avoid nested runtime panics. Inside a
/// `current_thread` runtime it falls back to its own runtime, which blocks
/// the caller's executor for the duration of the request.
pub struct OsrmRoutingProvider {
    client: Client,
    config: OsrmRoutingConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for OsrmRoutingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsrmRoutingProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl OsrmRoutingProvider {
    /// Create a new provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OsrmRoutingConfig::new(base_url))
    }

    /// Create a new provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OsrmRoutingConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("ecoroute-osrm")
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OsrmRoutingConfig {
        &self.config
    }

    /// Build the OSRM Route API URL for one origin-destination pair.
    ///
    /// The URL format is
    /// `{base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?...`.
    fn build_route_url(
        &self,
        origin: Location,
        destination: Location,
        alternatives: bool,
    ) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?alternatives={alternatives}&steps=true&geometries=geojson&overview=full",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        )
    }

    /// Fetch and decode one Route response.
    ///
    /// OSRM reports `NoRoute` with a 4xx status, so the body is decoded
    /// before the status is judged.
    async fn fetch_routes_async(&self, url: String) -> Result<Vec<OsrmRoute>, RoutingError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        match serde_json::from_str::<RouteResponse>(&body) {
            Ok(parsed) => Self::convert_response(parsed),
            Err(_) if !status.is_success() => Err(RoutingError::HttpError {
                url,
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_EXCERPT).collect(),
            }),
            Err(err) => Err(RoutingError::ParseError {
                message: err.to_string(),
            }),
        }
    }

    fn fetch_routes(
        &self,
        origin: Location,
        destination: Location,
        alternatives: bool,
    ) -> Result<Vec<OsrmRoute>, RoutingError> {
        let url = self.build_route_url(origin, destination, alternatives);
        let future = self.fetch_routes_async(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            // No runtime detected, or current_thread runtime: use our own runtime.
            _ => self.runtime.block_on(future),
        }
    }

    /// Convert a reqwest error to a `RoutingError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> RoutingError {
        if error.is_timeout() {
            return RoutingError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return RoutingError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        RoutingError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    /// Routes of a decoded response; `NoRoute` is an empty list.
    fn convert_response(response: RouteResponse) -> Result<Vec<OsrmRoute>, RoutingError> {
        if response.is_no_route() {
            return Ok(Vec::new());
        }
        if !response.is_ok() {
            return Err(RoutingError::ServiceError {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }
        Ok(response.routes)
    }
}

/// Each step with a positive length becomes one leg, named after its road.
fn to_provider_route(route: &OsrmRoute) -> ProviderRoute {
    let legs = route
        .legs
        .iter()
        .flat_map(|leg| &leg.steps)
        .filter(|step| step.distance > 0.0)
        .map(|step| {
            let leg = Leg::new(step.distance / 1_000.0, step.duration);
            if step.name.is_empty() {
                leg
            } else {
                leg.with_link_id(step.name.as_str())
            }
        })
        .collect();
    ProviderRoute::new(route.distance / 1_000.0, route.duration).with_legs(legs)
}

fn to_candidate(index: usize, route: &OsrmRoute) -> RouteCandidate {
    let label = if index == 0 {
        "primary".to_owned()
    } else {
        format!("alternative-{index}")
    };
    RouteCandidate {
        label,
        priority: u32::try_from(index).unwrap_or(u32::MAX),
        provider: PROVIDER_NAME.to_owned(),
        route: to_provider_route(route),
        polyline: route.geometry.as_ref().map(|geometry| {
            geometry
                .coordinates
                .iter()
                .map(|&(longitude, latitude)| Location {
                    latitude,
                    longitude,
                })
                .collect()
        }),
    }
}

impl RoutingProvider for OsrmRoutingProvider {
    fn route(&self, origin: Location, destination: Location) -> Result<RouteLookup, RoutingError> {
        let routes = self.fetch_routes(origin, destination, false)?;
        Ok(routes
            .first()
            .map_or(RouteLookup::NotFound, |route| {
                RouteLookup::Found(to_provider_route(route))
            }))
    }

    fn route_alternatives(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<Vec<RouteCandidate>, RoutingError> {
        let routes = self.fetch_routes(origin, destination, true)?;
        log::debug!(
            "OSRM offered {} routes from ({}, {}) to ({}, {})",
            routes.len(),
            origin.latitude,
            origin.longitude,
            destination.latitude,
            destination.longitude
        );
        Ok(routes
            .iter()
            .enumerate()
            .map(|(index, route)| to_candidate(index, route))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::osrm::{Geometry, OsrmLeg, OsrmStep};
    use rstest::{fixture, rstest};

    #[fixture]
    fn provider() -> OsrmRoutingProvider {
        OsrmRoutingProvider::new("http://osrm.example.com/").expect("provider should build")
    }

    fn step(distance: f64, duration: f64, name: &str) -> OsrmStep {
        OsrmStep {
            distance,
            duration,
            name: name.to_owned(),
        }
    }

    fn sample_route(distance: f64) -> OsrmRoute {
        OsrmRoute {
            distance,
            duration: 600.0,
            geometry: Some(Geometry {
                coordinates: vec![(126.68, 35.94), (127.15, 35.82)],
            }),
            legs: vec![OsrmLeg {
                steps: vec![
                    step(distance - 500.0, 550.0, "Honam-ro"),
                    step(500.0, 50.0, ""),
                    step(0.0, 0.0, "Arrive"),
                ],
            }],
        }
    }

    #[rstest]
    fn build_route_url_formats_coordinates(provider: OsrmRoutingProvider) {
        let origin = Location::new(35.94, 126.68).expect("valid");
        let destination = Location::new(35.09, 128.82).expect("valid");

        let url = provider.build_route_url(origin, destination, true);

        assert_eq!(
            url,
            "http://osrm.example.com/route/v1/driving/126.68,35.94;128.82,35.09?alternatives=true&steps=true&geometries=geojson&overview=full"
        );
    }

    #[rstest]
    fn build_route_url_uses_profile() {
        let config = OsrmRoutingConfig::new("http://osrm.example.com").with_profile("truck");
        let provider = OsrmRoutingProvider::with_config(config).expect("provider should build");
        let here = Location::new(0.0, 0.0).expect("valid");

        let url = provider.build_route_url(here, here, false);

        assert!(url.starts_with("http://osrm.example.com/route/v1/truck/"));
        assert!(url.contains("alternatives=false"));
    }

    #[rstest]
    fn steps_become_legs_in_kilometres() {
        let route = to_provider_route(&sample_route(10_000.0));

        assert_eq!(route.total_distance_km, 10.0);
        assert_eq!(route.total_time_sec, 600.0);
        assert_eq!(route.legs.len(), 2, "zero-length arrival step is dropped");
        let first = route.legs.first().expect("leg");
        assert_eq!(first.distance_km, 9.5);
        assert_eq!(first.link_id.as_deref(), Some("Honam-ro"));
        assert!(route.legs.last().expect("leg").link_id.is_none());
    }

    #[rstest]
    fn candidates_are_labelled_by_position() {
        let primary = to_candidate(0, &sample_route(10_000.0));
        let second = to_candidate(2, &sample_route(12_000.0));

        assert_eq!(primary.label, "primary");
        assert_eq!(primary.priority, 0);
        assert_eq!(primary.provider, PROVIDER_NAME);
        assert_eq!(second.label, "alternative-2");
        assert_eq!(second.priority, 2);
        let polyline = primary.polyline.expect("geometry");
        assert_eq!(
            polyline.first().copied(),
            Some(Location {
                latitude: 35.94,
                longitude: 126.68
            })
        );
    }

    #[rstest]
    fn no_route_is_an_empty_list() {
        let response = RouteResponse {
            code: "NoRoute".to_owned(),
            message: Some("Impossible route".to_owned()),
            routes: Vec::new(),
        };

        let routes = OsrmRoutingProvider::convert_response(response).expect("not an error");

        assert!(routes.is_empty());
    }

    #[rstest]
    fn service_errors_keep_code_and_message() {
        let response = RouteResponse {
            code: "InvalidQuery".to_owned(),
            message: Some("Query string malformed".to_owned()),
            routes: Vec::new(),
        };

        let err = OsrmRoutingProvider::convert_response(response).expect_err("should fail");

        assert_eq!(
            err,
            RoutingError::ServiceError {
                code: "InvalidQuery".to_owned(),
                message: "Query string malformed".to_owned(),
            }
        );
    }

    #[rstest]
    fn unreachable_service_is_a_network_error() {
        // Port 9 (discard) on localhost refuses connections on test hosts.
        let config = OsrmRoutingConfig::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let provider = OsrmRoutingProvider::with_config(config).expect("provider should build");
        let here = Location::new(35.0, 128.0).expect("valid");

        let err = provider.route(here, here).expect_err("nothing listens there");

        assert!(matches!(
            err,
            RoutingError::NetworkError { .. }
                | RoutingError::Timeout { .. }
                | RoutingError::HttpError { .. }
        ));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = OsrmRoutingConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.profile, "driving");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }
}
