//! Contract with the external routing provider.
//!
//! Providers answer two questions: the single best route between two
//! locations, and the set of alternative routes a driver could take. A pair
//! with no route is reported as [`RouteLookup::NotFound`] and never as a
//! zero-length route, so callers can tell "no route" apart from "free route".

use crate::{Leg, Location, RoutingError};

/// Distance, duration, and sub-legs of one provider route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderRoute {
    /// Route length in kilometres.
    pub total_distance_km: f64,
    /// Free-flow duration in seconds.
    pub total_time_sec: f64,
    /// Ordered sub-legs. May be empty when the provider has no breakdown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub legs: Vec<Leg>,
}

impl ProviderRoute {
    /// A route with no sub-leg breakdown.
    #[must_use]
    pub const fn new(total_distance_km: f64, total_time_sec: f64) -> Self {
        Self {
            total_distance_km,
            total_time_sec,
            legs: Vec::new(),
        }
    }

    /// Attach sub-legs.
    #[must_use]
    pub fn with_legs(mut self, legs: Vec<Leg>) -> Self {
        self.legs = legs;
        self
    }

    /// The sub-legs to score, or a single leg spanning the whole route when
    /// the provider gave no breakdown.
    ///
    /// # Examples
    /// ```
    /// use ecoroute_core::ProviderRoute;
    ///
    /// let route = ProviderRoute::new(12.5, 900.0);
    /// let legs = route.scoring_legs();
    /// assert_eq!(legs.len(), 1);
    /// assert_eq!(legs[0].distance_km, 12.5);
    /// ```
    #[must_use]
    pub fn scoring_legs(&self) -> Vec<Leg> {
        if self.legs.is_empty() {
            vec![Leg::new(self.total_distance_km, self.total_time_sec)]
        } else {
            self.legs.clone()
        }
    }
}

/// Tagged answer to a single-route query.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteLookup {
    /// The provider found a route.
    Found(ProviderRoute),
    /// The provider knows of no route between the locations.
    NotFound,
}

impl RouteLookup {
    /// The route, if one was found.
    #[must_use]
    pub fn into_route(self) -> Option<ProviderRoute> {
        match self {
            Self::Found(route) => Some(route),
            Self::NotFound => None,
        }
    }
}

/// One origin-to-destination alternative offered for single-job runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteCandidate {
    /// Provider label, such as `"primary"`.
    pub label: String,
    /// Provider ranking. Lower is more recommended; `0` is the default route.
    pub priority: u32,
    /// Name of the provider that produced the candidate.
    pub provider: String,
    /// The route itself.
    pub route: ProviderRoute,
    /// Optional drawable geometry.
    #[cfg_attr(feature = "serde", serde(default))]
    pub polyline: Option<Vec<Location>>,
}

/// Source of routing data.
///
/// Implementations are called synchronously and, while building a route
/// matrix, from several threads at once. Adapters that talk to a network
/// service should apply their own per-call timeouts.
///
/// # Examples
///
/// ```rust
/// use ecoroute_core::{
///     Location, ProviderRoute, RouteCandidate, RouteLookup, RoutingError, RoutingProvider,
/// };
///
/// struct StraightLine;
///
/// impl RoutingProvider for StraightLine {
///     fn route(
///         &self,
///         origin: Location,
///         destination: Location,
///     ) -> Result<RouteLookup, RoutingError> {
///         let km = (origin.latitude - destination.latitude).abs() * 111.0;
///         Ok(RouteLookup::Found(ProviderRoute::new(km, km * 60.0)))
///     }
///
///     fn route_alternatives(
///         &self,
///         origin: Location,
///         destination: Location,
///     ) -> Result<Vec<RouteCandidate>, RoutingError> {
///         Ok(self
///             .route(origin, destination)?
///             .into_route()
///             .map(|route| RouteCandidate {
///                 label: "straight".to_owned(),
///                 priority: 0,
///                 provider: "demo".to_owned(),
///                 route,
///                 polyline: None,
///             })
///             .into_iter()
///             .collect())
///     }
/// }
///
/// let a = Location::new(35.0, 128.0).expect("valid");
/// let b = Location::new(36.0, 128.0).expect("valid");
/// let lookup = StraightLine.route(a, b)?;
/// assert!(matches!(lookup, RouteLookup::Found(_)));
/// # Ok::<(), RoutingError>(())
/// ```
pub trait RoutingProvider {
    /// Best route from `origin` to `destination`.
    fn route(&self, origin: Location, destination: Location)
    -> Result<RouteLookup, RoutingError>;

    /// Every alternative the provider offers, in provider order.
    ///
    /// An empty list means the provider knows no route.
    fn route_alternatives(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<Vec<RouteCandidate>, RoutingError>;
}

impl<T: RoutingProvider + ?Sized> RoutingProvider for &T {
    fn route(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<RouteLookup, RoutingError> {
        (**self).route(origin, destination)
    }

    fn route_alternatives(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<Vec<RouteCandidate>, RoutingError> {
        (**self).route_alternatives(origin, destination)
    }
}
