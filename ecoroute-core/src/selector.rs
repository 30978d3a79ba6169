//! Route choice for runs with exactly one job.
//!
//! Every alternative the provider offers between the depot and the job is
//! re-scored with the [`EmissionModel`]. Candidates that arrive after the
//! job's window closes are discarded, and the lowest-emission survivor is
//! the eco choice. The provider's own recommendation is kept alongside as a
//! baseline for comparison.

use std::cmp::Ordering;

use crate::{
    EmissionModel, Job, Location, PlanError, RouteCandidate, RouteEmission, RoutingProvider,
    Vehicle,
};

/// A provider candidate together with its emission score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// The candidate as offered by the provider.
    pub candidate: RouteCandidate,
    /// Emission and time recomputed for the run's vehicle and environment.
    pub emission: RouteEmission,
}

impl ScoredCandidate {
    fn eco_order(&self, other: &Self) -> Ordering {
        self.emission
            .co2_total_g
            .total_cmp(&other.emission.co2_total_g)
            .then_with(|| {
                self.candidate
                    .route
                    .total_distance_km
                    .total_cmp(&other.candidate.route.total_distance_km)
            })
            .then_with(|| {
                self.emission
                    .total_time_sec
                    .total_cmp(&other.emission.total_time_sec)
            })
    }
}

/// Outcome of single-job route selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Lowest-emission candidate that meets the job's window.
    pub eco: ScoredCandidate,
    /// Provider-recommended candidate, when it differs from `eco` and meets
    /// the window.
    pub baseline: Option<ScoredCandidate>,
    /// Provider-recommended candidate that misses the window. It takes no
    /// part in the comparison.
    pub infeasible_baseline: Option<ScoredCandidate>,
}

/// Pick the eco route from `depot` to `job` for `vehicle`.
///
/// The vehicle is assumed to leave loaded with the job's demand. Candidates
/// without a sub-leg breakdown are scored as one leg spanning the route.
///
/// # Errors
///
/// - [`PlanError::ProviderUnavailable`] when the provider fails or offers no
///   candidates.
/// - [`PlanError::TimeWindowInfeasible`] when every candidate arrives after
///   the job's window closes.
pub fn select_route<P>(
    provider: &P,
    depot: Location,
    job: &Job,
    vehicle: &Vehicle,
    model: &EmissionModel<'_>,
) -> Result<Selection, PlanError>
where
    P: RoutingProvider + ?Sized,
{
    let candidates = provider
        .route_alternatives(depot, job.location)
        .map_err(|err| PlanError::ProviderUnavailable {
            message: format!("route alternatives to job {}: {err}", job.id),
        })?;
    if candidates.is_empty() {
        return Err(PlanError::ProviderUnavailable {
            message: format!("no route candidates to job {}", job.id),
        });
    }

    let scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| score(candidate, job, vehicle, model))
        .collect();
    log::debug!("scored {} route candidates for job {}", scored.len(), job.id);

    let deadline = f64::from(job.time_window.end);
    let meets_window = |entry: &ScoredCandidate| entry.emission.total_time_sec <= deadline;

    let eco_index = scored
        .iter()
        .enumerate()
        .filter(|(_, entry)| meets_window(entry))
        .min_by(|(_, lhs), (_, rhs)| lhs.eco_order(rhs))
        .map(|(index, _)| index)
        .ok_or_else(|| PlanError::TimeWindowInfeasible {
            message: format!(
                "all {} candidates reach job {} after {}s",
                scored.len(),
                job.id,
                job.time_window.end
            ),
        })?;
    let baseline_index = scored
        .iter()
        .enumerate()
        .min_by_key(|(_, entry)| entry.candidate.priority)
        .map_or(eco_index, |(index, _)| index);

    let eco = scored[eco_index].clone();
    let (baseline, infeasible_baseline) = if baseline_index == eco_index {
        (None, None)
    } else {
        let recommended = scored[baseline_index].clone();
        if meets_window(&recommended) {
            (Some(recommended), None)
        } else {
            log::info!(
                "baseline route {} misses the window of job {}",
                recommended.candidate.label,
                job.id
            );
            (None, Some(recommended))
        }
    };

    Ok(Selection {
        eco,
        baseline,
        infeasible_baseline,
    })
}

fn score(
    candidate: RouteCandidate,
    job: &Job,
    vehicle: &Vehicle,
    model: &EmissionModel<'_>,
) -> ScoredCandidate {
    let legs = candidate.route.scoring_legs();
    let emission = model.route(legs.iter().map(|leg| leg.carrying(job.demand_kg)), vehicle);
    ScoredCandidate {
        candidate,
        emission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubRoutingProvider;
    use crate::{EngineSettings, EnvironmentalContext, ProviderRoute, TimeWindow};
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

    #[fixture]
    fn depot() -> Location {
        Location::new(35.94, 126.68).expect("valid")
    }

    #[fixture]
    fn job() -> Job {
        Job::new("j1", Location::new(35.09, 128.82).expect("valid"), 100.0).expect("valid")
    }

    #[fixture]
    fn truck() -> Vehicle {
        Vehicle::new("t1", 25_000.0, 1_200.0, 10.0).expect("valid")
    }

    #[rstest]
    fn picks_lowest_emission_and_keeps_recommendation(depot: Location, job: Job, truck: Vehicle) {
        let provider = StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 320.0, 14_400.0),
            candidate("alternative-1", 1, 305.0, 15_200.0),
        ]);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let selection = select_route(&provider, depot, &job, &truck, &model).expect("selected");

        assert_eq!(selection.eco.candidate.label, "alternative-1");
        let baseline = selection.baseline.expect("baseline kept");
        assert_eq!(baseline.candidate.label, "primary");
        assert!(selection.eco.emission.co2_total_g <= baseline.emission.co2_total_g);
        assert_eq!(provider.alternatives_calls(), 1);
    }

    #[rstest]
    fn late_candidates_are_discarded(depot: Location, truck: Vehicle) {
        let job = Job::new("j1", Location::new(35.09, 128.82).expect("valid"), 100.0)
            .expect("valid")
            .with_time_window(TimeWindow::new(0, 15_000).expect("ordered"));
        let provider = StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 320.0, 14_400.0),
            candidate("alternative-1", 1, 305.0, 15_200.0),
        ]);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let selection = select_route(&provider, depot, &job, &truck, &model).expect("selected");

        assert_eq!(selection.eco.candidate.label, "primary");
        assert!(selection.baseline.is_none());
        assert!(selection.infeasible_baseline.is_none());
    }

    #[rstest]
    fn late_baseline_is_reported_but_not_compared(depot: Location, truck: Vehicle) {
        let job = Job::new("j1", Location::new(35.09, 128.82).expect("valid"), 100.0)
            .expect("valid")
            .with_time_window(TimeWindow::new(0, 15_000).expect("ordered"));
        let provider = StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 300.0, 16_000.0),
            candidate("alternative-1", 1, 330.0, 14_000.0),
        ]);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let selection = select_route(&provider, depot, &job, &truck, &model).expect("selected");

        assert_eq!(selection.eco.candidate.label, "alternative-1");
        assert!(selection.baseline.is_none());
        let late = selection.infeasible_baseline.expect("late baseline reported");
        assert_eq!(late.candidate.label, "primary");
    }

    #[rstest]
    fn ties_break_on_distance_then_time(depot: Location, job: Job) {
        // With zero emission factors every candidate emits nothing.
        let ghost = Vehicle::new("g", 1_000.0, 0.0, 0.0).expect("valid");
        let provider = StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 12.0, 900.0),
            candidate("alternative-1", 1, 10.0, 1_000.0),
            candidate("alternative-2", 2, 10.0, 950.0),
        ]);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let selection = select_route(&provider, depot, &job, &ghost, &model).expect("selected");

        assert_eq!(selection.eco.candidate.label, "alternative-2");
    }

    #[rstest]
    #[case::no_candidates(StubRoutingProvider::default())]
    #[case::provider_failure(StubRoutingProvider::default().failing_alternatives())]
    fn provider_gaps_are_unavailable(
        #[case] provider: StubRoutingProvider,
        depot: Location,
        job: Job,
        truck: Vehicle,
    ) {
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let err = select_route(&provider, depot, &job, &truck, &model).expect_err("no route");

        assert!(matches!(err, PlanError::ProviderUnavailable { .. }));
    }

    #[rstest]
    fn all_late_is_window_infeasible(depot: Location, truck: Vehicle) {
        let job = Job::new("j1", Location::new(35.09, 128.82).expect("valid"), 100.0)
            .expect("valid")
            .with_time_window(TimeWindow::new(0, 600).expect("ordered"));
        let provider = StubRoutingProvider::default()
            .with_candidates(vec![candidate("primary", 0, 320.0, 14_400.0)]);
        let settings = EngineSettings::default();
        let environment = EnvironmentalContext::default();
        let model = EmissionModel::new(&settings, &environment);

        let err = select_route(&provider, depot, &job, &truck, &model).expect_err("too late");

        assert!(matches!(err, PlanError::TimeWindowInfeasible { .. }));
    }
}
