//! Multi-stop sequencing contract.
//!
//! A [`Sequencer`] decides which vehicle visits which jobs, and in what
//! order, for runs with two or more jobs. The [`SequencingProblem`] it
//! receives carries everything needed to price an arc. Arc costs are pure
//! functions of `(from, to, vehicle)` and the run's environment snapshot,
//! so an implementation can evaluate them from any thread without shared
//! mutable state.

use thiserror::Error;

use crate::{EmissionModel, EngineSettings, Job, RouteMatrix, TimeWindow, Vehicle};

/// Everything a sequencer may consult about one run.
#[derive(Debug, Clone, Copy)]
pub struct SequencingProblem<'a> {
    /// Jobs to serve; job `i` is node `i + 1`.
    pub jobs: &'a [Job],
    /// Available fleet.
    pub vehicles: &'a [Vehicle],
    /// Provider routes between nodes.
    pub matrix: &'a RouteMatrix,
    /// Emission model bound to the run's environment.
    pub model: EmissionModel<'a>,
    /// Engine tuning, including the search budget.
    pub settings: &'a EngineSettings,
}

impl<'a> SequencingProblem<'a> {
    /// Bundle the inputs of a sequencing run.
    #[must_use]
    pub const fn new(
        jobs: &'a [Job],
        vehicles: &'a [Vehicle],
        matrix: &'a RouteMatrix,
        model: EmissionModel<'a>,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            jobs,
            vehicles,
            matrix,
            model,
            settings,
        }
    }

    /// Number of nodes, depot included.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.jobs.len() + 1
    }

    /// Job served at `node`, or `None` for the depot.
    #[must_use]
    pub fn job_at(&self, node: usize) -> Option<&'a Job> {
        node.checked_sub(1).and_then(|index| self.jobs.get(index))
    }

    /// Load assumed on board while pricing an arc leaving `from`.
    ///
    /// This is the demand of the departure node, so arcs out of the depot
    /// are priced empty. It is not the load a vehicle would really carry;
    /// reported figures are recomputed with the realised load afterwards.
    #[must_use]
    pub fn search_load_kg(&self, from: usize) -> f64 {
        self.job_at(from).map_or(0.0, |job| job.demand_kg)
    }

    /// Arrival window of `node`. The depot is pinned to the run's start.
    #[must_use]
    pub fn window_at(&self, node: usize) -> TimeWindow {
        self.job_at(node).map_or(TimeWindow { start: 0, end: 0 }, |job| job.time_window)
    }

    /// Eco-cost of `from -> to` driven by vehicle `vehicle`.
    ///
    /// `None` marks an arc without provider data, which must never be used.
    #[must_use]
    pub fn arc_cost(&self, from: usize, to: usize, vehicle: usize) -> Option<u64> {
        let vehicle_profile = self.vehicles.get(vehicle)?;
        let route = self.matrix.get(from, to)?;
        let load = self.search_load_kg(from);
        let legs = route.scoring_legs();
        let emission = self
            .model
            .route(legs.iter().map(|leg| leg.carrying(load)), vehicle_profile);
        Some(self.model.eco_cost(&emission))
    }

    /// Congestion-adjusted travel time of `from -> to`, in seconds.
    ///
    /// Load does not affect time, so the value is the same for every
    /// vehicle. `None` marks an unusable arc.
    #[must_use]
    pub fn arc_time(&self, from: usize, to: usize, vehicle: usize) -> Option<f64> {
        let vehicle_profile = self.vehicles.get(vehicle)?;
        let route = self.matrix.get(from, to)?;
        Some(
            self.model
                .route(route.scoring_legs(), vehicle_profile)
                .total_time_sec,
        )
    }
}

/// Ordered job nodes visited by one vehicle, depot excluded.
///
/// The vehicle departs the depot at the run's start and its route ends at
/// the last stop; no return arc is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleTour {
    /// Index into the run's vehicle list.
    pub vehicle_index: usize,
    /// Node indices in visiting order.
    pub stops: Vec<usize>,
}

/// Raw output of a sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencedPlan {
    /// One tour per vehicle that leaves the depot.
    pub tours: Vec<VehicleTour>,
}

/// Failures reported by a [`Sequencer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// The search finished without a feasible plan.
    #[error("{message}")]
    NoSolution {
        /// Why no plan was accepted.
        message: String,
    },
    /// Some jobs were left out only because their windows could not be met.
    #[error("{message}")]
    TimeWindowInfeasible {
        /// Which jobs missed their windows.
        message: String,
    },
    /// The problem could not be expressed for the underlying solver.
    #[error("{message}")]
    Model {
        /// Solver-specific detail.
        message: String,
    },
}

/// Assigns and orders jobs across the fleet.
///
/// Implementations must stop searching once
/// [`EngineSettings::search_time_limit`] elapses and either return the best
/// feasible plan found or [`SequenceError::NoSolution`]. A plan that leaves
/// a job unvisited or uses an unusable arc is an error, never a partial
/// success.
pub trait Sequencer: Send + Sync {
    /// Produce a visiting order for `problem`.
    fn sequence(&self, problem: &SequencingProblem<'_>) -> Result<SequencedPlan, SequenceError>;
}

impl<T: Sequencer + ?Sized> Sequencer for &T {
    fn sequence(&self, problem: &SequencingProblem<'_>) -> Result<SequencedPlan, SequenceError> {
        (**self).sequence(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnvironmentalContext, Location, ProviderRoute};
    use rstest::rstest;

    fn jobs() -> Vec<Job> {
        let here = Location::new(35.0, 128.0).expect("valid");
        vec![
            Job::new("a", here, 300.0).expect("valid job"),
            Job::new("b", here, 200.0)
                .expect("valid job")
                .with_time_window(TimeWindow::new(600, 1_200).expect("ordered")),
        ]
    }

    #[rstest]
    fn arc_cost_carries_the_departure_node_demand() {
        let jobs = jobs();
        let vehicles = vec![Vehicle::new("v", 1_000.0, 1_000.0, 0.0).expect("valid")];
        let matrix = RouteMatrix::from_routes(
            3,
            [
                ((0, 1), ProviderRoute::new(1.0, 60.0)),
                ((1, 2), ProviderRoute::new(1.0, 60.0)),
            ],
        );
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);
        let problem = SequencingProblem::new(&jobs, &vehicles, &matrix, model, &settings);

        // Leaving the depot: 1 km at 1000 g/km empty is 1000 g;
        // 1000 * (0.8 * 1.0 + 0.2 * 60) = 12800.
        assert_eq!(problem.search_load_kg(0), 0.0);
        assert_eq!(problem.arc_cost(0, 1, 0), Some(12_800));
        // Leaving job a with its 300 kg: weight 1 + 0.1 * 0.3 = 1.03, so
        // 1030 g and 1000 * (0.8 * 1.03 + 0.2 * 60) = 12824.
        assert_eq!(problem.search_load_kg(1), 300.0);
        assert_eq!(problem.arc_cost(1, 2, 0), Some(12_824));
        assert_eq!(problem.arc_cost(1, 0, 0), None);
        assert_eq!(problem.arc_cost(0, 1, 3), None);
    }

    #[rstest]
    fn depot_window_is_pinned_to_start() {
        let jobs = jobs();
        let vehicles: Vec<Vehicle> = Vec::new();
        let matrix = RouteMatrix::from_routes(3, []);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);
        let problem = SequencingProblem::new(&jobs, &vehicles, &matrix, model, &settings);

        assert_eq!(problem.window_at(0), TimeWindow { start: 0, end: 0 });
        assert_eq!(problem.window_at(2), TimeWindow { start: 600, end: 1_200 });
        assert_eq!(problem.window_at(1), TimeWindow::unconstrained());
        assert!(problem.job_at(3).is_none());
    }
}
