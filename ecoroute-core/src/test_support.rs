//! Deterministic in-memory collaborators for unit and behaviour tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    Assignment, Location, PersistError, ProviderRoute, ResultSink, RouteCandidate, RouteLookup,
    RoutingError, RoutingProvider, RunSummary, SequenceError, SequencedPlan, Sequencer,
    SequencingProblem, VehicleTour,
};

type PairKey = (u64, u64, u64, u64);

fn pair_key(origin: Location, destination: Location) -> PairKey {
    (
        origin.latitude.to_bits(),
        origin.longitude.to_bits(),
        destination.latitude.to_bits(),
        destination.longitude.to_bits(),
    )
}

/// Great-circle distance in kilometres.
#[must_use]
pub fn haversine_km(origin: Location, destination: Location) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6_371.0;
    let lat1 = origin.latitude.to_radians();
    let lat2 = destination.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (destination.longitude - origin.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Scriptable [`RoutingProvider`] that counts its calls.
///
/// Pair-specific settings win over the straight-line rule, which wins over
/// the uniform route. With nothing configured every pair is
/// [`RouteLookup::NotFound`].
#[derive(Debug, Default)]
pub struct StubRoutingProvider {
    uniform: Option<ProviderRoute>,
    straight_line_kmh: Option<f64>,
    routes: HashMap<PairKey, ProviderRoute>,
    missing: HashSet<PairKey>,
    failing: HashSet<PairKey>,
    candidates: Vec<RouteCandidate>,
    alternatives_fail: bool,
    route_calls: AtomicUsize,
    alternatives_calls: AtomicUsize,
}

impl StubRoutingProvider {
    /// Answer every pair with the same route.
    #[must_use]
    pub fn with_uniform_route(mut self, distance_km: f64, time_sec: f64) -> Self {
        self.uniform = Some(ProviderRoute::new(distance_km, time_sec));
        self
    }

    /// Answer every pair with its great-circle distance driven at
    /// `speed_kmh`.
    #[must_use]
    pub fn with_straight_line_speed(mut self, speed_kmh: f64) -> Self {
        self.straight_line_kmh = Some(speed_kmh);
        self
    }

    /// Answer one ordered pair with `route`.
    #[must_use]
    pub fn with_route(
        mut self,
        origin: Location,
        destination: Location,
        route: ProviderRoute,
    ) -> Self {
        self.routes.insert(pair_key(origin, destination), route);
        self
    }

    /// Report no route for one ordered pair.
    #[must_use]
    pub fn without_route(mut self, origin: Location, destination: Location) -> Self {
        self.missing.insert(pair_key(origin, destination));
        self
    }

    /// Fail with a network error for one ordered pair.
    #[must_use]
    pub fn failing_between(mut self, origin: Location, destination: Location) -> Self {
        self.failing.insert(pair_key(origin, destination));
        self
    }

    /// Offer `candidates` for every alternatives query.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<RouteCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Fail every alternatives query with a service error.
    #[must_use]
    pub fn failing_alternatives(mut self) -> Self {
        self.alternatives_fail = true;
        self
    }

    /// Number of [`RoutingProvider::route`] calls so far.
    #[must_use]
    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    /// Number of [`RoutingProvider::route_alternatives`] calls so far.
    #[must_use]
    pub fn alternatives_calls(&self) -> usize {
        self.alternatives_calls.load(Ordering::SeqCst)
    }
}

impl RoutingProvider for StubRoutingProvider {
    fn route(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<RouteLookup, RoutingError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        let key = pair_key(origin, destination);
        if self.failing.contains(&key) {
            return Err(RoutingError::NetworkError {
                url: "stub://route".to_owned(),
                message: "scripted failure".to_owned(),
            });
        }
        if self.missing.contains(&key) {
            return Ok(RouteLookup::NotFound);
        }
        if let Some(route) = self.routes.get(&key) {
            return Ok(RouteLookup::Found(route.clone()));
        }
        if let Some(speed_kmh) = self.straight_line_kmh {
            let km = haversine_km(origin, destination);
            return Ok(RouteLookup::Found(ProviderRoute::new(
                km,
                km / speed_kmh * 3_600.0,
            )));
        }
        Ok(self
            .uniform
            .clone()
            .map_or(RouteLookup::NotFound, RouteLookup::Found))
    }

    fn route_alternatives(
        &self,
        _origin: Location,
        _destination: Location,
    ) -> Result<Vec<RouteCandidate>, RoutingError> {
        self.alternatives_calls.fetch_add(1, Ordering::SeqCst);
        if self.alternatives_fail {
            return Err(RoutingError::ServiceError {
                code: "StubFailure".to_owned(),
                message: "scripted failure".to_owned(),
            });
        }
        Ok(self.candidates.clone())
    }
}

/// [`Sequencer`] returning a scripted plan.
///
/// Without scripted tours every job goes to the first vehicle in input
/// order.
#[derive(Debug, Default)]
pub struct FixedOrderSequencer {
    tours: Option<Vec<VehicleTour>>,
    calls: AtomicUsize,
}

impl FixedOrderSequencer {
    /// Return `tours` on every call.
    #[must_use]
    pub fn with_tours(tours: Vec<VehicleTour>) -> Self {
        Self {
            tours: Some(tours),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of sequencing calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sequencer for FixedOrderSequencer {
    fn sequence(&self, problem: &SequencingProblem<'_>) -> Result<SequencedPlan, SequenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tours = self.tours.clone().unwrap_or_else(|| {
            vec![VehicleTour {
                vehicle_index: 0,
                stops: (1..problem.node_count()).collect(),
            }]
        });
        Ok(SequencedPlan { tours })
    }
}

/// [`ResultSink`] that rejects every save.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl ResultSink for FailingSink {
    fn save(&self, summary: &RunSummary, _assignments: &[Assignment]) -> Result<(), PersistError> {
        Err(PersistError::Backend {
            run_id: summary.run_id.clone(),
            route_name: summary.route_name.clone(),
            message: "storage offline".to_owned(),
        })
    }
}
