//! OSRM API response types for the Route service.
//!
//! Only the fields the engine reads are modelled. Requests always ask for
//! `steps=true` and `geometries=geojson`.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use serde::Deserialize;

/// OSRM Route API response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"NoRoute"` - No route between the coordinates
    /// - `"InvalidQuery"` - Invalid query parameters
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Routes in provider order; the first is OSRM's recommendation.
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

impl RouteResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }

    /// Check if OSRM found no route between the coordinates.
    #[must_use]
    pub fn is_no_route(&self) -> bool {
        self.code == "NoRoute"
    }
}

/// One route between the requested coordinates.
#[derive(Debug, Deserialize)]
pub struct OsrmRoute {
    /// Length in metres.
    pub distance: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Overview geometry.
    pub geometry: Option<Geometry>,
    /// One leg per pair of consecutive waypoints.
    #[serde(default)]
    pub legs: Vec<OsrmLeg>,
}

/// GeoJSON line string; coordinates are `[longitude, latitude]`.
#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// Vertices in order.
    pub coordinates: Vec<(f64, f64)>,
}

/// Route between two waypoints.
#[derive(Debug, Deserialize)]
pub struct OsrmLeg {
    /// Manoeuvre-level breakdown.
    #[serde(default)]
    pub steps: Vec<OsrmStep>,
}

/// One manoeuvre along a leg.
#[derive(Debug, Deserialize)]
pub struct OsrmStep {
    /// Length in metres.
    pub distance: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Road name; empty when the road is unnamed.
    #[serde(default)]
    pub name: String,
}
