//! Pairwise provider routes for multi-stop runs.
//!
//! Node `0` is the depot and node `i` (for `i >= 1`) is job `i - 1`. Every
//! ordered pair is fetched independently, so the fetches run on the `rayon`
//! pool and land in a pair-keyed map once all of them finish.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::{Location, ProviderRoute, RouteLookup, RoutingProvider};

/// Provider routes keyed by `(from, to)` node index.
///
/// A missing entry marks an unusable arc.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteMatrix {
    size: usize,
    routes: HashMap<(usize, usize), ProviderRoute>,
}

impl RouteMatrix {
    /// Fetch every ordered pair of `nodes` from `provider`.
    ///
    /// Pairs for which the provider fails or finds nothing are left out and
    /// logged. The diagonal holds zero-length routes.
    ///
    /// # Examples
    /// ```
    /// use ecoroute_core::{
    ///     Location, ProviderRoute, RouteCandidate, RouteLookup, RouteMatrix, RoutingError,
    ///     RoutingProvider,
    /// };
    ///
    /// struct FiveKilometres;
    ///
    /// impl RoutingProvider for FiveKilometres {
    ///     fn route(&self, _: Location, _: Location) -> Result<RouteLookup, RoutingError> {
    ///         Ok(RouteLookup::Found(ProviderRoute::new(5.0, 300.0)))
    ///     }
    ///
    ///     fn route_alternatives(
    ///         &self,
    ///         _: Location,
    ///         _: Location,
    ///     ) -> Result<Vec<RouteCandidate>, RoutingError> {
    ///         Ok(Vec::new())
    ///     }
    /// }
    ///
    /// let nodes = [
    ///     Location::new(35.0, 128.0).expect("valid"),
    ///     Location::new(35.1, 128.1).expect("valid"),
    /// ];
    /// let matrix = RouteMatrix::build(&FiveKilometres, &nodes);
    /// assert!(matrix.is_usable(0, 1));
    /// assert_eq!(matrix.get(1, 0).map(|route| route.total_distance_km), Some(5.0));
    /// ```
    pub fn build<P>(provider: &P, nodes: &[Location]) -> Self
    where
        P: RoutingProvider + Sync + ?Sized,
    {
        let size = nodes.len();
        let pairs: Vec<(usize, usize)> = (0..size)
            .flat_map(|from| {
                (0..size)
                    .filter(move |&to| to != from)
                    .map(move |to| (from, to))
            })
            .collect();
        log::debug!(
            "fetching {} provider routes for {size} nodes",
            pairs.len()
        );

        let fetched: HashMap<(usize, usize), ProviderRoute> = pairs
            .into_par_iter()
            .filter_map(|(from, to)| {
                let origin = *nodes.get(from)?;
                let destination = *nodes.get(to)?;
                match provider.route(origin, destination) {
                    Ok(RouteLookup::Found(route)) => Some(((from, to), route)),
                    Ok(RouteLookup::NotFound) => {
                        log::warn!("no route from node {from} to node {to}; arc is unusable");
                        None
                    }
                    Err(err) => {
                        log::warn!("routing {from} -> {to} failed: {err}; arc is unusable");
                        None
                    }
                }
            })
            .collect();

        Self::from_routes(size, fetched)
    }

    /// Assemble a matrix from known routes. Diagonal entries are added.
    #[must_use]
    pub fn from_routes<I>(size: usize, routes: I) -> Self
    where
        I: IntoIterator<Item = ((usize, usize), ProviderRoute)>,
    {
        let mut map: HashMap<(usize, usize), ProviderRoute> = routes
            .into_iter()
            .filter(|((from, to), _)| *from < size && *to < size)
            .collect();
        for node in 0..size {
            map.insert((node, node), ProviderRoute::new(0.0, 0.0));
        }
        Self { size, routes: map }
    }

    /// Number of nodes, depot included.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Route for the arc `from -> to`, if usable.
    #[must_use]
    pub fn get(&self, from: usize, to: usize) -> Option<&ProviderRoute> {
        self.routes.get(&(from, to))
    }

    /// Whether the arc `from -> to` has provider data.
    #[must_use]
    pub fn is_usable(&self, from: usize, to: usize) -> bool {
        self.routes.contains_key(&(from, to))
    }

    /// Number of off-diagonal arcs without provider data.
    #[must_use]
    pub fn unusable_arcs(&self) -> usize {
        let off_diagonal = self.size.saturating_mul(self.size.saturating_sub(1));
        let usable = self
            .routes
            .keys()
            .filter(|(from, to)| from != to)
            .count();
        off_diagonal.saturating_sub(usable)
    }
}
