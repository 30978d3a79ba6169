//! `vrp-core` modelling helpers for `VrpSequencer`.
//!
//! This module converts a [`SequencingProblem`] into a `vrp-core` problem,
//! runs the solver, and reads the resulting tours back as node indices.
//!
//! Node `0` is the depot and node `i` is job `i - 1`, which is also the
//! `vrp-core` location index. Vehicle `v` is given routing profile `v`, so
//! the transport cost can price an arc for the vehicle that drives it.

use std::sync::Arc;

use ecoroute_core::{SequenceError, SequencingProblem, VehicleTour};
use vrp_core::construction::heuristics::UnassignmentInfo;
use vrp_core::models::common::{Location, Profile, TimeWindow};
use vrp_core::models::problem::TravelTime;
use vrp_core::models::solution::Route as VrpRoute;
use vrp_core::prelude::*;

use crate::sequencer::VrpSequencerConfig;

/// Cost charged for an arc without provider data.
const UNREACHABLE_COST: f64 = 1.0e12;
/// Travel time charged for an arc without provider data; longer than any
/// delivery window.
const UNREACHABLE_SECS: f64 = 1.0e10;

/// Reported for a job whose window or the horizon cannot be met.
const TIME_VIOLATION_CODE: ViolationCode = ViolationCode(1);
/// Reported for a job that does not fit on any vehicle.
const CAPACITY_VIOLATION_CODE: ViolationCode = ViolationCode(2);

struct EcoCostTransport {
    /// Eco-cost per `[vehicle][from][to]`.
    costs: Vec<Vec<Vec<f64>>>,
    /// Congestion-adjusted seconds per `[from][to]`.
    durations: Vec<Vec<f64>>,
}

impl EcoCostTransport {
    fn new(problem: &SequencingProblem<'_>) -> Self {
        let nodes = problem.node_count();
        let costs = (0..problem.vehicles.len())
            .map(|vehicle| {
                (0..nodes)
                    .map(|from| {
                        (0..nodes)
                            .map(|to| {
                                problem
                                    .arc_cost(from, to, vehicle)
                                    .map_or(UNREACHABLE_COST, cost_as_f64)
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        let durations = (0..nodes)
            .map(|from| {
                (0..nodes)
                    .map(|to| problem.arc_time(from, to, 0).unwrap_or(UNREACHABLE_SECS))
                    .collect()
            })
            .collect();
        Self { costs, durations }
    }

    fn cost(&self, vehicle: usize, from: Location, to: Location) -> f64 {
        self.costs
            .get(vehicle)
            .and_then(|matrix| matrix.get(from))
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(UNREACHABLE_COST)
    }

    fn seconds(&self, from: Location, to: Location) -> f64 {
        self.durations
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(UNREACHABLE_SECS)
    }
}

impl TransportCost for EcoCostTransport {
    // The minimised "distance" is the eco-cost of the arc for the vehicle
    // driving the route; time constraints read the duration.
    fn distance(
        &self,
        route: &VrpRoute,
        from: Location,
        to: Location,
        _departure: TravelTime,
    ) -> Cost {
        self.cost(route.actor.vehicle.profile.index, from, to)
    }

    fn duration(
        &self,
        _route: &VrpRoute,
        from: Location,
        to: Location,
        _departure: TravelTime,
    ) -> f64 {
        self.seconds(from, to)
    }

    fn distance_approx(&self, profile: &Profile, from: usize, to: usize) -> f64 {
        self.cost(profile.index, from, to)
    }

    fn duration_approx(&self, _profile: &Profile, from: usize, to: usize) -> f64 {
        self.seconds(from, to)
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "eco-costs stay far below 2^52 for any realistic arc"
)]
const fn cost_as_f64(cost: u64) -> f64 {
    cost as f64
}

/// Demand in whole grams, rounded down.
///
/// Demands round down and capacities round up, so a run whose demands sum
/// to exactly a vehicle's capacity in kilograms still fits on it.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "loads are truncated to grams; `as` saturates out-of-range values"
)]
fn demand_grams(kg: f64) -> i32 {
    (kg * 1000.0).floor() as i32
}

/// Capacity in whole grams, rounded up.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "loads are truncated to grams; `as` saturates out-of-range values"
)]
fn capacity_grams(kg: f64) -> i32 {
    (kg * 1000.0).ceil() as i32
}

fn define_goal(transport: Arc<dyn TransportCost>) -> GenericResult<GoalContext> {
    let minimize_unassigned = MinimizeUnassignedBuilder::new("min-unassigned").build()?;
    let capacity_feature = CapacityFeatureBuilder::<SingleDimLoad>::new("capacity")
        .set_violation_code(CAPACITY_VIOLATION_CODE)
        .build()?;
    let transport_feature = TransportFeatureBuilder::new("min-eco-cost")
        .set_violation_code(TIME_VIOLATION_CODE)
        .set_transport_cost(transport)
        .set_time_constrained(true)
        .build_minimize_distance()?;

    GoalContextBuilder::with_features(&[minimize_unassigned, transport_feature, capacity_feature])?
        .build()
}

fn define_problem(
    problem: &SequencingProblem<'_>,
    goal: GoalContext,
    transport: Arc<dyn TransportCost>,
) -> GenericResult<Problem> {
    // Windows are cut at the horizon. The vehicles get no end time because
    // that would add a return place at the depot.
    let horizon = problem.settings.horizon_sec;
    let jobs = problem
        .jobs
        .iter()
        .enumerate()
        .map(|(idx, job)| {
            let node = idx + 1;
            let end = job.time_window.end.min(horizon);
            let start = job.time_window.start.min(end);
            SingleBuilder::default()
                .id(format!("node-{node}").as_str())
                .demand(Demand::delivery(demand_grams(job.demand_kg)))
                .location(node)?
                .times(vec![TimeWindow::new(f64::from(start), f64::from(end))])?
                .build_as_job()
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Vehicles start at the depot at the run's start and have no end place,
    // which leaves every route open after its last delivery.
    let vehicles = problem
        .vehicles
        .iter()
        .enumerate()
        .map(|(idx, vehicle)| {
            VehicleBuilder::default()
                .id(format!("vehicle-{idx}").as_str())
                .add_detail(
                    VehicleDetailBuilder::default()
                        .set_start_location(0)
                        .set_start_time(0.0)
                        .build()?,
                )
                .set_profile_idx(idx)
                .capacity(SingleDimLoad::new(capacity_grams(vehicle.capacity_kg)))
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?;

    ProblemBuilder::default()
        .add_jobs(jobs.into_iter())
        .add_vehicles(vehicles.into_iter())
        .with_goal(goal)
        .with_transport_cost(transport)
        .build()
}

fn model_error(err: impl ToString) -> SequenceError {
    SequenceError::Model {
        message: err.to_string(),
    }
}

/// Context for running a `vrp-core` search with shared settings.
pub(super) struct VrpSolveContext<'a> {
    config: &'a VrpSequencerConfig,
}

impl<'a> VrpSolveContext<'a> {
    /// Create a new solve context.
    pub(super) const fn new(config: &'a VrpSequencerConfig) -> Self {
        Self { config }
    }

    /// Search for tours serving every job of `problem`.
    pub(super) fn solve(
        &self,
        problem: &SequencingProblem<'_>,
    ) -> Result<Vec<VehicleTour>, SequenceError> {
        let transport = Arc::new(EcoCostTransport::new(problem));
        let goal = define_goal(transport.clone()).map_err(model_error)?;
        let vrp_problem = Arc::new(define_problem(problem, goal, transport).map_err(model_error)?);

        let max_time = usize::try_from(problem.settings.search_time_limit().as_secs())
            .unwrap_or(usize::MAX);
        log::debug!(
            "sequencing {} jobs across {} vehicles for at most {max_time}s or {} generations",
            problem.jobs.len(),
            problem.vehicles.len(),
            self.config.max_generations
        );
        let vrp_config = VrpConfigBuilder::new(vrp_problem.clone())
            .prebuild()
            .map_err(model_error)?
            .with_max_time(Some(max_time))
            .with_max_generations(Some(self.config.max_generations))
            .build()
            .map_err(model_error)?;

        let solution = vrp_core::solver::Solver::new(vrp_problem, vrp_config)
            .solve()
            .map_err(|err| SequenceError::NoSolution {
                message: err.to_string(),
            })?;

        if !solution.unassigned.is_empty() {
            return Err(unassigned_error(problem, &solution.unassigned));
        }

        let tours = solution
            .routes
            .iter()
            .map(|route| VehicleTour {
                vehicle_index: route.actor.vehicle.profile.index,
                stops: route
                    .tour
                    .all_activities()
                    .map(|activity| activity.place.location)
                    .filter(|&location| location != 0)
                    .collect(),
            })
            .filter(|tour| !tour.stops.is_empty())
            .collect();
        Ok(tours)
    }
}

/// Why a job was left out of every tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unassigned {
    TimeWindow,
    Capacity,
    Unknown,
}

impl Unassigned {
    fn from_info(info: &UnassignmentInfo) -> Self {
        let codes: Vec<ViolationCode> = match info {
            UnassignmentInfo::Unknown => Vec::new(),
            UnassignmentInfo::Simple(code) => vec![*code],
            UnassignmentInfo::Detailed(details) => details.iter().map(|(_, code)| *code).collect(),
        };
        Self::from_codes(&codes)
    }

    /// A job that fits on no vehicle is a capacity problem even if some
    /// vehicle also misses its window.
    fn from_codes(codes: &[ViolationCode]) -> Self {
        if codes.contains(&CAPACITY_VIOLATION_CODE) {
            Self::Capacity
        } else if !codes.is_empty() && codes.iter().all(|code| *code == TIME_VIOLATION_CODE) {
            Self::TimeWindow
        } else {
            Self::Unknown
        }
    }
}

fn node_of(job: &Job) -> Option<usize> {
    job.as_single()
        .and_then(|single| single.places.first())
        .and_then(|place| place.location)
}

/// Whether even the fastest inbound arc, taken at the run's start, lands
/// after the job's window closes at or before the horizon.
fn misses_window(problem: &SequencingProblem<'_>, node: usize) -> bool {
    let window = problem.window_at(node);
    let end = f64::from(window.end.min(problem.settings.horizon_sec));
    (0..problem.node_count())
        .filter(|&from| from != node && problem.matrix.is_usable(from, node))
        .filter_map(|from| problem.arc_time(from, node, 0))
        .all(|seconds| seconds > end)
}

/// Turn the solver's unassigned jobs into the matching failure.
///
/// Only a run where every left-out job missed its window is reported as
/// time-window infeasible; anything else is a plain lack of solution.
fn unassigned_error(
    problem: &SequencingProblem<'_>,
    unassigned: &[(Job, UnassignmentInfo)],
) -> SequenceError {
    let reasons: Vec<(String, Unassigned)> = unassigned
        .iter()
        .map(|(vrp_job, info)| {
            let node = node_of(vrp_job);
            let mut reason = Unassigned::from_info(info);
            // The solver gives no code when nothing could be inserted at all.
            if reason == Unassigned::Unknown
                && node.is_some_and(|index| misses_window(problem, index))
            {
                reason = Unassigned::TimeWindow;
            }
            let name = node
                .and_then(|index| problem.job_at(index))
                .map_or_else(|| "unknown".to_owned(), |job| job.id.clone());
            (name, reason)
        })
        .collect();
    let names = |wanted: Unassigned| {
        reasons
            .iter()
            .filter(|(_, reason)| *reason == wanted)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    if reasons.iter().all(|(_, reason)| *reason == Unassigned::TimeWindow) {
        return SequenceError::TimeWindowInfeasible {
            message: format!(
                "{} of {} jobs cannot be reached within their windows: {}",
                reasons.len(),
                problem.jobs.len(),
                names(Unassigned::TimeWindow)
            ),
        };
    }
    let capacity = names(Unassigned::Capacity);
    let detail = if capacity.is_empty() {
        String::new()
    } else {
        format!(" (over capacity: {capacity})")
    };
    SequenceError::NoSolution {
        message: format!(
            "{} of {} jobs cannot be served within capacity and time windows{detail}",
            reasons.len(),
            problem.jobs.len()
        ),
    }
}
