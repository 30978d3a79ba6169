//! Orchestration of one planning run.
//!
//! [`Planner::optimise`] validates the request and dispatches on job count:
//! one job goes through the single-destination selector, two or more build
//! a [`RouteMatrix`] and go to the configured [`Sequencer`].
//! [`Planner::plan`] wraps that in the status reporting and persistence an
//! outer surface needs.

use jiff::civil::DateTime;

use crate::report::{single_result, translate};
use crate::selector::select_route;
use crate::{
    BASELINE_ROUTE_NAME, Comparison, ECO_ROUTE_NAME, EmissionModel, EngineSettings,
    EnvironmentResolver, EnvironmentalContext, FixedEnvironment, Job, Location, PlanError,
    ResultSink, RouteMatrix, RouteResult, RoutingProvider, Sequencer, SequencingProblem, Vehicle,
};

/// Inputs of one planning run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanRequest {
    /// Run identifier used for reporting and persistence.
    pub run_id: String,
    /// Where every vehicle starts.
    pub depot: Option<Location>,
    /// Jobs to serve.
    pub jobs: Vec<Job>,
    /// Available fleet. Single-job runs use the first vehicle.
    pub vehicles: Vec<Vehicle>,
    /// Instant that time-window offsets count from.
    pub run_reference_time: DateTime,
    /// Pre-resolved environment. When absent, the planner's resolver is
    /// asked for the reference time.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub environment: Option<EnvironmentalContext>,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum PlanStatus {
    /// Results were computed and stored.
    Success,
    /// Results were computed but could not be stored.
    Warning,
    /// No results could be computed.
    Failed,
}

/// Computed route options of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanReport {
    /// Route options, eco first.
    pub results: Vec<RouteResult>,
    /// Eco against baseline, when both exist.
    pub comparison: Option<Comparison>,
    /// Observations worth surfacing to the caller.
    pub notes: Vec<String>,
}

/// Response handed back to the caller of [`Planner::plan`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanOutcome {
    /// Overall status.
    pub status: PlanStatus,
    /// Run identifier.
    pub run_id: String,
    /// Route options; empty when the run failed.
    pub results: Vec<RouteResult>,
    /// Eco against baseline, for single-job runs with two options.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub comparison: Option<Comparison>,
    /// Failure reason, persistence warning, or notes.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub message: Option<String>,
}

/// Plans runs against a routing provider, a sequencer, and a result sink.
pub struct Planner<P, Q, S> {
    provider: P,
    sequencer: Q,
    sink: S,
    settings: EngineSettings,
    resolver: Box<dyn EnvironmentResolver + Send + Sync>,
}

impl<P, Q, S> Planner<P, Q, S>
where
    P: RoutingProvider + Sync,
    Q: Sequencer,
    S: ResultSink,
{
    /// Planner with default settings and a neutral environment.
    pub fn new(provider: P, sequencer: Q, sink: S) -> Self {
        Self {
            provider,
            sequencer,
            sink,
            settings: EngineSettings::default(),
            resolver: Box::new(FixedEnvironment::default()),
        }
    }

    /// Replace the engine settings.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve environments for requests that do not carry one.
    #[must_use]
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: EnvironmentResolver + Send + Sync + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    /// Settings in use.
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Compute route options without persisting them.
    ///
    /// # Errors
    ///
    /// Any [`PlanError`]. Missing input is reported before the provider or
    /// sequencer is called.
    pub fn optimise(&self, request: &PlanRequest) -> Result<PlanReport, PlanError> {
        let depot = request
            .depot
            .ok_or(PlanError::InputIncomplete { what: "depot" })?;
        if request.jobs.is_empty() {
            return Err(PlanError::InputIncomplete { what: "jobs" });
        }
        if request.vehicles.is_empty() {
            return Err(PlanError::InputIncomplete { what: "vehicles" });
        }

        depot.validate()?;
        for job in &request.jobs {
            job.validate()?;
        }
        for vehicle in &request.vehicles {
            vehicle.validate()?;
        }
        let environment = request
            .environment
            .unwrap_or_else(|| self.resolver.resolve(request.run_reference_time));
        environment.validate()?;
        check_fleet_capacity(&request.jobs, &request.vehicles)?;

        let model = EmissionModel::new(&self.settings, &environment);
        if let [job] = request.jobs.as_slice() {
            self.plan_single(request, depot, job, &model)
        } else {
            self.plan_multi(request, depot, model)
        }
    }

    /// Compute, persist, and report a run.
    ///
    /// Failures become status `failed`. A persistence failure after a
    /// successful computation becomes status `warning` with the results
    /// still attached.
    pub fn plan(&self, request: &PlanRequest) -> PlanOutcome {
        let report = match self.optimise(request) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("run {} failed: {err}", request.run_id);
                return PlanOutcome {
                    status: PlanStatus::Failed,
                    run_id: request.run_id.clone(),
                    results: Vec::new(),
                    comparison: None,
                    message: Some(err.to_string()),
                };
            }
        };

        let mut notes = report.notes;
        let mut status = PlanStatus::Success;
        for result in &report.results {
            if let Err(err) = self.sink.save(&result.summary, &result.assignments) {
                log::warn!("run {}: {err}", request.run_id);
                notes.push(format!("results not saved: {err}"));
                status = PlanStatus::Warning;
            }
        }
        log::info!(
            "run {} finished with {} route option(s)",
            request.run_id,
            report.results.len()
        );

        PlanOutcome {
            status,
            run_id: request.run_id.clone(),
            results: report.results,
            comparison: report.comparison,
            message: (!notes.is_empty()).then(|| notes.join("; ")),
        }
    }

    fn plan_single(
        &self,
        request: &PlanRequest,
        depot: Location,
        job: &Job,
        model: &EmissionModel<'_>,
    ) -> Result<PlanReport, PlanError> {
        let vehicle = request
            .vehicles
            .first()
            .ok_or(PlanError::InputIncomplete { what: "vehicles" })?;
        if job.demand_kg > vehicle.capacity_kg {
            return Err(PlanError::CapacityExceeded {
                vehicle_id: vehicle.id.clone(),
                load_kg: job.demand_kg,
                capacity_kg: vehicle.capacity_kg,
            });
        }

        let selection = select_route(&self.provider, depot, job, vehicle, model)?;
        let run_id = request.run_id.as_str();
        let eco = single_result(run_id, ECO_ROUTE_NAME, &selection.eco, job, vehicle, model);
        let mut notes = Vec::new();
        if let Some(late) = &selection.infeasible_baseline {
            notes.push(format!(
                "recommended route {} misses the delivery window of job {}",
                late.candidate.label, job.id
            ));
        }

        let Some(baseline) = &selection.baseline else {
            return Ok(PlanReport {
                results: vec![eco],
                comparison: None,
                notes,
            });
        };
        let base = single_result(run_id, BASELINE_ROUTE_NAME, baseline, job, vehicle, model);
        let comparison = Comparison::between(&eco, &base);
        log::info!(
            "run {run_id}: eco route {} saves {} g CO2 over {}",
            selection.eco.candidate.label,
            comparison.co2_saving_g,
            baseline.candidate.label
        );
        Ok(PlanReport {
            results: vec![eco, base],
            comparison: Some(comparison),
            notes,
        })
    }

    fn plan_multi(
        &self,
        request: &PlanRequest,
        depot: Location,
        model: EmissionModel<'_>,
    ) -> Result<PlanReport, PlanError> {
        let nodes: Vec<Location> = std::iter::once(depot)
            .chain(request.jobs.iter().map(|job| job.location))
            .collect();
        let matrix = RouteMatrix::build(&self.provider, &nodes);
        let unusable = matrix.unusable_arcs();
        if unusable == nodes.len() * (nodes.len() - 1) {
            return Err(PlanError::ProviderUnavailable {
                message: format!("no routes between any of the {} locations", nodes.len()),
            });
        }
        if unusable > 0 {
            log::warn!(
                "run {}: {unusable} arc(s) have no route and will not be used",
                request.run_id
            );
        }

        let problem = SequencingProblem::new(
            &request.jobs,
            &request.vehicles,
            &matrix,
            model,
            &self.settings,
        );
        let plan = self.sequencer.sequence(&problem)?;
        let result = translate(&request.run_id, ECO_ROUTE_NAME, &plan, &problem)?;
        Ok(PlanReport {
            results: vec![result],
            comparison: None,
            notes: Vec::new(),
        })
    }
}

fn check_fleet_capacity(jobs: &[Job], vehicles: &[Vehicle]) -> Result<(), PlanError> {
    let largest = vehicles
        .iter()
        .max_by(|lhs, rhs| lhs.capacity_kg.total_cmp(&rhs.capacity_kg));
    let Some(largest) = largest else {
        return Err(PlanError::InputIncomplete { what: "vehicles" });
    };
    match jobs.iter().find(|job| job.demand_kg > largest.capacity_kg) {
        Some(job) => Err(PlanError::CapacityExceeded {
            vehicle_id: largest.id.clone(),
            load_kg: job.demand_kg,
            capacity_kg: largest.capacity_kg,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingSink, FixedOrderSequencer, StubRoutingProvider};
    use crate::{MemorySink, ModelError, ProviderRoute, RouteCandidate};
    use jiff::civil::date;
    use rstest::{fixture, rstest};

    fn candidate(label: &str, priority: u32, km: f64, secs: f64) -> RouteCandidate {
        RouteCandidate {
            label: label.to_owned(),
            priority,
            provider: "stub".to_owned(),
            route: ProviderRoute::new(km, secs),
            polyline: None,
        }
    }

    fn job(id: &str, demand_kg: f64) -> Job {
        Job::new(id, Location::new(35.09, 128.82).expect("valid"), demand_kg).expect("valid")
    }

    #[fixture]
    fn request() -> PlanRequest {
        PlanRequest {
            run_id: "run-1".to_owned(),
            depot: Some(Location::new(35.94, 126.68).expect("valid")),
            jobs: vec![job("j1", 100.0)],
            vehicles: vec![Vehicle::new("t1", 25_000.0, 1_200.0, 10.0).expect("valid")],
            run_reference_time: date(2025, 10, 15).at(8, 0, 0, 0),
            environment: None,
        }
    }

    fn two_options() -> StubRoutingProvider {
        StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 320.0, 14_400.0),
            candidate("alternative-1", 1, 305.0, 15_200.0),
        ])
    }

    #[rstest]
    fn single_job_reports_eco_baseline_and_comparison(request: PlanRequest) {
        let sink = MemorySink::default();
        let planner = Planner::new(two_options(), FixedOrderSequencer::default(), &sink);

        let outcome = planner.plan(&request);

        assert_eq!(outcome.status, PlanStatus::Success);
        let names: Vec<&str> = outcome
            .results
            .iter()
            .map(|result| result.route_name.as_str())
            .collect();
        assert_eq!(names, vec![ECO_ROUTE_NAME, BASELINE_ROUTE_NAME]);
        let comparison = outcome.comparison.expect("two options compared");
        assert!(comparison.co2_saving_g > 0.0);
        assert_eq!(comparison.distance_diff_km, -15.0);
        assert_eq!(sink.len(), 2);
    }

    #[rstest]
    #[case::no_jobs(|r: &mut PlanRequest| r.jobs.clear(), "jobs")]
    #[case::no_vehicles(|r: &mut PlanRequest| r.vehicles.clear(), "vehicles")]
    #[case::no_depot(|r: &mut PlanRequest| r.depot = None, "depot")]
    fn missing_input_fails_without_calls(
        mut request: PlanRequest,
        #[case] strip: fn(&mut PlanRequest),
        #[case] missing: &str,
    ) {
        strip(&mut request);
        let provider = two_options();
        let sequencer = FixedOrderSequencer::default();
        let planner = Planner::new(&provider, &sequencer, MemorySink::default());

        let outcome = planner.plan(&request);

        assert_eq!(outcome.status, PlanStatus::Failed);
        assert!(outcome.results.is_empty());
        assert!(outcome.message.expect("reason").contains(missing));
        assert_eq!(provider.route_calls() + provider.alternatives_calls(), 0);
        assert_eq!(sequencer.calls(), 0);
    }

    #[rstest]
    fn persistence_failure_is_a_warning_with_results(request: PlanRequest) {
        let planner = Planner::new(two_options(), FixedOrderSequencer::default(), FailingSink);

        let outcome = planner.plan(&request);

        assert_eq!(outcome.status, PlanStatus::Warning);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.message.expect("warning").contains("not saved"));
    }

    #[rstest]
    fn invalid_job_is_rejected(mut request: PlanRequest) {
        request.jobs[0].demand_kg = -1.0;
        let planner = Planner::new(
            two_options(),
            FixedOrderSequencer::default(),
            MemorySink::default(),
        );

        let err = planner.optimise(&request).expect_err("negative demand");

        assert!(matches!(
            err,
            PlanError::InvalidInput(ModelError::NegativeDemand { .. })
        ));
    }

    #[rstest]
    fn oversized_job_exceeds_capacity(mut request: PlanRequest) {
        request.jobs[0].demand_kg = 30_000.0;
        let planner = Planner::new(
            two_options(),
            FixedOrderSequencer::default(),
            MemorySink::default(),
        );

        let err = planner.optimise(&request).expect_err("too heavy");

        assert!(matches!(err, PlanError::CapacityExceeded { .. }));
    }

    #[rstest]
    fn resolver_supplies_missing_environment(request: PlanRequest) {
        let rush = EnvironmentalContext::new(2.0, 0.0, 1.0, 0.0).expect("valid");
        let planner = Planner::new(
            two_options(),
            FixedOrderSequencer::default(),
            MemorySink::default(),
        )
        .with_resolver(FixedEnvironment(rush));

        let report = planner.optimise(&request).expect("planned");

        let assignment = &report.results[0].assignments[0];
        assert_eq!(assignment.congestion_factor, 2.0);
    }

    #[rstest]
    fn multi_job_runs_through_the_sequencer(mut request: PlanRequest) {
        request.jobs = vec![job("j1", 100.0), job("j2", 200.0)];
        let provider = StubRoutingProvider::default().with_uniform_route(10.0, 600.0);
        let sequencer = FixedOrderSequencer::default();
        let planner = Planner::new(&provider, &sequencer, MemorySink::default());

        let report = planner.optimise(&request).expect("planned");

        assert_eq!(sequencer.calls(), 1);
        assert_eq!(provider.route_calls(), 6);
        assert!(report.comparison.is_none());
        let result = &report.results[0];
        assert_eq!(result.route_name, ECO_ROUTE_NAME);
        assert_eq!(result.assignments.len(), 2);
        assert_eq!(result.summary.total_distance_km, 20.0);
        assert_eq!(result.summary.total_time_min, 20.0);
    }

    #[rstest]
    fn multi_job_without_any_route_is_unavailable(mut request: PlanRequest) {
        request.jobs = vec![job("j1", 100.0), job("j2", 200.0)];
        let sequencer = FixedOrderSequencer::default();
        let planner = Planner::new(
            StubRoutingProvider::default(),
            &sequencer,
            MemorySink::default(),
        );

        let err = planner.optimise(&request).expect_err("no routes");

        assert!(matches!(err, PlanError::ProviderUnavailable { .. }));
        assert_eq!(sequencer.calls(), 0);
    }
}
