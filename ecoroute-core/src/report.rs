//! Translation of chosen routes into reported figures.
//!
//! The sequencer prices arcs with an approximate load. Everything reported
//! here is recomputed from the realised plan: the load actually on board
//! when each arc is driven and the arrival time actually reached at each
//! stop, including any wait for a window to open. Translation reads only its
//! arguments, so translating the same plan twice yields the same figures.

use crate::{
    EmissionModel, Job, Location, PlanError, ScoredCandidate, SequencedPlan, SequencingProblem,
    Vehicle,
};

/// Route option name of the emission-optimal result.
pub const ECO_ROUTE_NAME: &str = "eco";
/// Route option name of the provider-recommended result.
pub const BASELINE_ROUTE_NAME: &str = "baseline";

const WINDOW_TOLERANCE_SEC: f64 = 1e-6;
const CAPACITY_TOLERANCE_KG: f64 = 1e-9;

/// One traversed arc of a route option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    /// Run identifier.
    pub run_id: String,
    /// Route option name.
    pub route_name: String,
    /// Vehicle driving the arc.
    pub vehicle_id: String,
    /// 1-based position of the arc in the vehicle's route.
    pub step_order: u32,
    /// Job the arc starts at; `None` is the depot.
    pub start_job_id: Option<String>,
    /// Job the arc ends at.
    pub end_job_id: Option<String>,
    /// Provider distance, in kilometres.
    pub distance_km: f64,
    /// Recomputed CO2, in grams.
    pub co2_g: f64,
    /// Load on board when the arc starts, in kilograms.
    pub load_kg: f64,
    /// Congestion-adjusted travel time, in minutes.
    pub time_min: f64,
    /// Distance-weighted gradient used, in percent.
    pub slope_pct: f64,
    /// Time-inflation factor used.
    pub congestion_factor: f64,
}

/// Totals of one route option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: String,
    /// Route option name.
    pub route_name: String,
    /// Summed arc distance, in kilometres.
    pub total_distance_km: f64,
    /// Summed arc CO2, in grams.
    pub total_co2_g: f64,
    /// Latest vehicle completion time, in minutes.
    pub total_time_min: f64,
}

/// A reported route option: its summary and its arcs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteResult {
    /// Route option name.
    pub route_name: String,
    /// Totals.
    pub summary: RunSummary,
    /// Arcs in vehicle then step order.
    pub assignments: Vec<Assignment>,
    /// Provider label of the chosen candidate, for single-job runs.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub label: Option<String>,
    /// Provider that produced the candidate, for single-job runs.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub provider: Option<String>,
    /// Drawable geometry, when the provider supplied one.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub polyline: Option<Vec<Location>>,
}

/// Savings of the eco option over the baseline option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comparison {
    /// Name of the recommended option.
    pub recommended_route: String,
    /// Name of the baseline option.
    pub baseline_route: String,
    /// Provider of the recommended option.
    pub recommended_provider: Option<String>,
    /// Provider of the baseline option.
    pub baseline_provider: Option<String>,
    /// Baseline CO2 minus eco CO2, in grams.
    pub co2_saving_g: f64,
    /// Saving as a percentage of baseline CO2.
    pub co2_saving_pct: f64,
    /// Eco distance minus baseline distance, in kilometres.
    pub distance_diff_km: f64,
    /// Distance difference as a percentage of baseline distance.
    pub distance_diff_pct: f64,
    /// Eco time minus baseline time, in minutes.
    pub time_diff_min: f64,
}

impl Comparison {
    /// Compare two route options of the same run by their summaries.
    ///
    /// Percentages divide by 1 when the baseline figure is zero.
    ///
    /// # Examples
    /// ```
    /// use ecoroute_core::{Comparison, RouteResult, RunSummary};
    ///
    /// let option = |name: &str, km: f64, co2: f64, min: f64| RouteResult {
    ///     route_name: name.to_owned(),
    ///     summary: RunSummary {
    ///         run_id: "r1".to_owned(),
    ///         route_name: name.to_owned(),
    ///         total_distance_km: km,
    ///         total_co2_g: co2,
    ///         total_time_min: min,
    ///     },
    ///     assignments: Vec::new(),
    ///     label: None,
    ///     provider: None,
    ///     polyline: None,
    /// };
    /// let comparison = Comparison::between(
    ///     &option("eco", 95.0, 900.0, 70.0),
    ///     &option("baseline", 100.0, 1_000.0, 60.0),
    /// );
    /// assert_eq!(comparison.co2_saving_g, 100.0);
    /// assert_eq!(comparison.co2_saving_pct, 10.0);
    /// assert_eq!(comparison.distance_diff_km, -5.0);
    /// assert_eq!(comparison.time_diff_min, 10.0);
    /// ```
    #[must_use]
    pub fn between(eco: &RouteResult, baseline: &RouteResult) -> Self {
        let eco_summary = &eco.summary;
        let base_summary = &baseline.summary;
        let co2_saving_g = base_summary.total_co2_g - eco_summary.total_co2_g;
        let distance_diff_km = eco_summary.total_distance_km - base_summary.total_distance_km;
        Self {
            recommended_route: eco.route_name.clone(),
            baseline_route: baseline.route_name.clone(),
            recommended_provider: eco.provider.clone(),
            baseline_provider: baseline.provider.clone(),
            co2_saving_g: round_to(co2_saving_g, 3),
            co2_saving_pct: round_to(percent_of(co2_saving_g, base_summary.total_co2_g), 2),
            distance_diff_km: round_to(distance_diff_km, 3),
            distance_diff_pct: round_to(
                percent_of(distance_diff_km, base_summary.total_distance_km),
                2,
            ),
            time_diff_min: round_to(eco_summary.total_time_min - base_summary.total_time_min, 3),
        }
    }
}

/// Report a single-job route option.
///
/// The vehicle leaves the depot loaded with the job's demand and the run's
/// time is the candidate's travel time.
#[must_use]
pub fn single_result(
    run_id: &str,
    route_name: &str,
    scored: &ScoredCandidate,
    job: &Job,
    vehicle: &Vehicle,
    model: &EmissionModel<'_>,
) -> RouteResult {
    let emission = &scored.emission;
    let distance_km = scored.candidate.route.total_distance_km;
    let assignment = Assignment {
        run_id: run_id.to_owned(),
        route_name: route_name.to_owned(),
        vehicle_id: vehicle.id.clone(),
        step_order: 1,
        start_job_id: None,
        end_job_id: Some(job.id.clone()),
        distance_km: round_to(distance_km, 3),
        co2_g: round_to(emission.co2_total_g, 5),
        load_kg: job.demand_kg,
        time_min: round_to(emission.total_time_sec / 60.0, 2),
        slope_pct: emission.mean_slope_pct,
        congestion_factor: model.environment().time_inflation,
    };
    RouteResult {
        route_name: route_name.to_owned(),
        summary: RunSummary {
            run_id: run_id.to_owned(),
            route_name: route_name.to_owned(),
            total_distance_km: round_to(distance_km, 2),
            total_co2_g: round_to(emission.co2_total_g, 3),
            total_time_min: round_to(emission.total_time_sec / 60.0, 2),
        },
        assignments: vec![assignment],
        label: Some(scored.candidate.label.clone()),
        provider: Some(scored.candidate.provider.clone()),
        polyline: scored.candidate.polyline.clone(),
    }
}

/// Report a multi-stop plan as one route option.
///
/// Each vehicle leaves the depot at the run's start carrying the demand of
/// every job on its tour and drops each job's demand on arrival. Waiting for
/// a window to open delays every later stop. Nothing is charged after the
/// last stop.
///
/// # Errors
///
/// - [`PlanError::NoSolution`] when the plan names an unknown vehicle or
///   node, or does not visit every job exactly once.
/// - [`PlanError::CapacityExceeded`] when a tour's demand exceeds its
///   vehicle's capacity.
/// - [`PlanError::ProviderUnavailable`] when the plan drives an unusable arc.
/// - [`PlanError::TimeWindowInfeasible`] when a stop is reached after its
///   window closes or served after the settings' horizon.
pub fn translate(
    run_id: &str,
    route_name: &str,
    plan: &SequencedPlan,
    problem: &SequencingProblem<'_>,
) -> Result<RouteResult, PlanError> {
    let mut visits = vec![0_usize; problem.jobs.len()];
    let mut assignments = Vec::new();
    let mut total_distance_km = 0.0;
    let mut total_co2_g = 0.0;
    let mut completion_sec: f64 = 0.0;
    let congestion_factor = problem.model.environment().time_inflation;
    let horizon_sec = f64::from(problem.settings.horizon_sec);

    for tour in plan.tours.iter().filter(|tour| !tour.stops.is_empty()) {
        let vehicle =
            problem
                .vehicles
                .get(tour.vehicle_index)
                .ok_or_else(|| PlanError::NoSolution {
                    message: format!("plan uses unknown vehicle {}", tour.vehicle_index),
                })?;
        let stops = tour
            .stops
            .iter()
            .map(|&node| {
                problem
                    .job_at(node)
                    .map(|job| (node, job))
                    .ok_or_else(|| PlanError::NoSolution {
                        message: format!("plan visits unknown node {node}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut load_kg: f64 = stops.iter().map(|(_, job)| job.demand_kg).sum();
        if load_kg > vehicle.capacity_kg + CAPACITY_TOLERANCE_KG {
            return Err(PlanError::CapacityExceeded {
                vehicle_id: vehicle.id.clone(),
                load_kg,
                capacity_kg: vehicle.capacity_kg,
            });
        }

        let mut clock_sec = 0.0;
        let mut previous: (usize, Option<&Job>) = (0, None);
        for (step, &(node, job)) in stops.iter().enumerate() {
            visits[node - 1] += 1;
            let (from, from_job) = previous;
            let route = problem
                .matrix
                .get(from, node)
                .ok_or_else(|| PlanError::ProviderUnavailable {
                    message: format!("no route from node {from} to node {node}"),
                })?;
            let legs = route.scoring_legs();
            let emission = problem
                .model
                .route(legs.iter().map(|leg| leg.carrying(load_kg)), vehicle);

            let arrival_sec = clock_sec + emission.total_time_sec;
            if arrival_sec > f64::from(job.time_window.end) + WINDOW_TOLERANCE_SEC {
                return Err(PlanError::TimeWindowInfeasible {
                    message: format!(
                        "vehicle {} reaches job {} at {arrival_sec:.0}s, after its window closes at {}s",
                        vehicle.id, job.id, job.time_window.end
                    ),
                });
            }

            assignments.push(Assignment {
                run_id: run_id.to_owned(),
                route_name: route_name.to_owned(),
                vehicle_id: vehicle.id.clone(),
                step_order: u32::try_from(step + 1).unwrap_or(u32::MAX),
                start_job_id: from_job.map(|start| start.id.clone()),
                end_job_id: Some(job.id.clone()),
                distance_km: round_to(route.total_distance_km, 3),
                co2_g: round_to(emission.co2_total_g, 5),
                load_kg,
                time_min: round_to(emission.total_time_sec / 60.0, 2),
                slope_pct: emission.mean_slope_pct,
                congestion_factor,
            });

            total_distance_km += route.total_distance_km;
            total_co2_g += emission.co2_total_g;
            clock_sec = arrival_sec.max(f64::from(job.time_window.start));
            if clock_sec > horizon_sec + WINDOW_TOLERANCE_SEC {
                return Err(PlanError::TimeWindowInfeasible {
                    message: format!(
                        "vehicle {} serves job {} at {clock_sec:.0}s, past the {}s horizon",
                        vehicle.id, job.id, problem.settings.horizon_sec
                    ),
                });
            }
            load_kg = (load_kg - job.demand_kg).max(0.0);
            previous = (node, Some(job));
        }
        completion_sec = completion_sec.max(clock_sec);
    }

    if let Some((index, count)) = visits.iter().enumerate().find(|(_, count)| **count != 1) {
        let job_id = problem.jobs.get(index).map_or("?", |job| job.id.as_str());
        return Err(PlanError::NoSolution {
            message: format!("plan visits job {job_id} {count} times"),
        });
    }

    Ok(RouteResult {
        route_name: route_name.to_owned(),
        summary: RunSummary {
            run_id: run_id.to_owned(),
            route_name: route_name.to_owned(),
            total_distance_km: round_to(total_distance_km, 2),
            total_co2_g: round_to(total_co2_g, 3),
            total_time_min: round_to(completion_sec / 60.0, 2),
        },
        assignments,
        label: None,
        provider: None,
        polyline: None,
    })
}

fn percent_of(value: f64, base: f64) -> f64 {
    let divisor = if base == 0.0 { 1.0 } else { base };
    value / divisor * 100.0
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        EngineSettings, EnvironmentalContext, ProviderRoute, RouteMatrix, TimeWindow, VehicleTour,
    };
    use rstest::{fixture, rstest};

    struct Run {
        jobs: Vec<Job>,
        vehicles: Vec<Vehicle>,
        matrix: RouteMatrix,
        settings: EngineSettings,
        environment: EnvironmentalContext,
    }

    impl Run {
        fn problem(&self) -> SequencingProblem<'_> {
            SequencingProblem::new(
                &self.jobs,
                &self.vehicles,
                &self.matrix,
                EmissionModel::new(&self.settings, &self.environment),
                &self.settings,
            )
        }
    }

    fn plan(tours: &[(usize, &[usize])]) -> SequencedPlan {
        SequencedPlan {
            tours: tours
                .iter()
                .map(|(vehicle_index, stops)| VehicleTour {
                    vehicle_index: *vehicle_index,
                    stops: stops.to_vec(),
                })
                .collect(),
        }
    }

    /// Depot plus three jobs; every arc is 6 km in 360 s (60 km/h).
    #[fixture]
    fn run() -> Run {
        let here = Location::new(35.0, 128.0).expect("valid");
        let jobs = vec![
            Job::new("a", here, 400.0).expect("valid"),
            Job::new("b", here, 300.0)
                .expect("valid")
                .with_time_window(TimeWindow::new(1_000, 5_000).expect("ordered")),
            Job::new("c", here, 300.0).expect("valid"),
        ];
        let vehicles = vec![
            Vehicle::new("v1", 1_000.0, 1_000.0, 0.0).expect("valid"),
            Vehicle::new("v2", 500.0, 1_000.0, 0.0).expect("valid"),
        ];
        let routes = (0..4).flat_map(|from| {
            (0..4)
                .filter(move |&to| to != from)
                .map(move |to| ((from, to), ProviderRoute::new(6.0, 360.0)))
        });
        Run {
            jobs,
            vehicles,
            matrix: RouteMatrix::from_routes(4, routes),
            settings: EngineSettings::default(),
            environment: EnvironmentalContext::default(),
        }
    }

    #[rstest]
    fn load_depletes_and_waits_delay_completion(run: Run) {
        let problem = run.problem();
        let result =
            translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 2, 3])]), &problem).expect("valid");

        let loads: Vec<f64> = result.assignments.iter().map(|a| a.load_kg).collect();
        assert_eq!(loads, vec![1_000.0, 600.0, 300.0]);
        let steps: Vec<u32> = result.assignments.iter().map(|a| a.step_order).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        assert_eq!(result.assignments[0].start_job_id, None);
        assert_eq!(result.assignments[1].start_job_id.as_deref(), Some("a"));

        // Arrive at b after 720 s, wait until 1000 s, then 360 s to c.
        assert_eq!(result.summary.total_time_min, round_to(1_360.0 / 60.0, 2));
        assert_eq!(result.summary.total_distance_km, 18.0);
    }

    #[rstest]
    fn completion_is_the_latest_vehicle_not_the_sum(run: Run) {
        let problem = run.problem();
        let result = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 3]), (1, &[2])]), &problem)
            .expect("valid");

        // v1 finishes at 720 s, v2 waits at b until 1000 s.
        assert_eq!(result.summary.total_time_min, round_to(1_000.0 / 60.0, 2));
        let distance: f64 = result.assignments.iter().map(|a| a.distance_km).sum();
        assert!((distance - result.summary.total_distance_km).abs() < 0.01);
    }

    #[rstest]
    fn capacity_equal_to_demand_is_accepted(run: Run) {
        let problem = run.problem();
        let result = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[3, 1, 2])]), &problem)
            .expect("full load accepted");
        assert_eq!(result.assignments[0].load_kg, 1_000.0);
    }

    #[rstest]
    fn overloaded_tour_is_rejected(run: Run) {
        let problem = run.problem();
        let err = translate("r1", ECO_ROUTE_NAME, &plan(&[(1, &[1, 2])]), &problem)
            .expect_err("700 kg on a 500 kg vehicle");
        assert!(matches!(err, PlanError::CapacityExceeded { .. }));
    }

    #[rstest]
    fn missed_window_is_rejected(mut run: Run) {
        run.jobs[1].time_window = TimeWindow::new(0, 500).expect("ordered");
        let problem = run.problem();
        let err = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 2, 3])]), &problem)
            .expect_err("b reached at 720 s");
        assert!(matches!(err, PlanError::TimeWindowInfeasible { .. }));
    }

    #[rstest]
    fn service_past_the_horizon_is_rejected(mut run: Run) {
        run.settings.horizon_sec = 900;
        let problem = run.problem();
        let err = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 2, 3])]), &problem)
            .expect_err("b is served at 1000 s");
        assert!(matches!(err, PlanError::TimeWindowInfeasible { .. }));
        assert!(err.to_string().contains("past the 900s horizon"), "{err}");

        run.settings.horizon_sec = 1_400;
        let problem = run.problem();
        translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 2, 3])]), &problem)
            .expect("c is reached at 1360 s");
    }

    #[rstest]
    #[case::skipped(&[1, 2])]
    #[case::repeated(&[2, 3, 2])]
    fn every_job_is_visited_once(run: Run, #[case] stops: &[usize]) {
        let problem = run.problem();
        let err = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, stops)]), &problem)
            .expect_err("bad visit count");
        assert!(matches!(err, PlanError::NoSolution { .. }));
    }

    #[rstest]
    fn unusable_arc_is_rejected(mut run: Run) {
        let usable = (0..4).flat_map(|from| {
            (0..4)
                .filter(move |&to| to != from && (from, to) != (1, 2))
                .map(move |to| ((from, to), ProviderRoute::new(6.0, 360.0)))
        });
        run.matrix = RouteMatrix::from_routes(4, usable);
        let problem = run.problem();
        let err = translate("r1", ECO_ROUTE_NAME, &plan(&[(0, &[1, 2, 3])]), &problem)
            .expect_err("1 -> 2 has no route");
        assert!(matches!(err, PlanError::ProviderUnavailable { .. }));
    }

    #[rstest]
    fn translation_is_repeatable(run: Run) {
        let problem = run.problem();
        let raw = plan(&[(0, &[2, 1]), (1, &[3])]);
        let first = translate("r1", ECO_ROUTE_NAME, &raw, &problem).expect("valid");
        let second = translate("r1", ECO_ROUTE_NAME, &raw, &problem).expect("valid");
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(1.23456, 2, 1.23)]
    #[case(2.5, 0, 3.0)]
    #[case(-2.5, 0, -3.0)]
    fn rounds_half_away_from_zero(#[case] value: f64, #[case] places: i32, #[case] expected: f64) {
        assert_eq!(round_to(value, places), expected);
    }
}
