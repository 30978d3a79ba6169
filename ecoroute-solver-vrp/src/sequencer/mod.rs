//! `VrpSequencer` implementation backed by `vrp-core`.

use std::time::Instant;

use ecoroute_core::{SequenceError, SequencedPlan, Sequencer, SequencingProblem, VehicleTour};

use crate::vrp::VrpSolveContext;

/// Configuration for [`VrpSequencer`].
///
/// The wall-clock budget comes from the run's
/// [`EngineSettings`](ecoroute_core::EngineSettings); whichever limit is hit
/// first ends the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrpSequencerConfig {
    /// Upper bound on `vrp-core` generations.
    pub max_generations: usize,
}

impl Default for VrpSequencerConfig {
    fn default() -> Self {
        Self {
            max_generations: 3000,
        }
    }
}

/// Native sequencer using `vrp-core` to search for low eco-cost tours.
#[derive(Debug, Clone, Default)]
pub struct VrpSequencer {
    config: VrpSequencerConfig,
}

impl VrpSequencer {
    /// Construct a sequencer using default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a sequencer with explicit configuration.
    #[must_use]
    pub const fn with_config(config: VrpSequencerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &VrpSequencerConfig {
        &self.config
    }
}

impl Sequencer for VrpSequencer {
    fn sequence(&self, problem: &SequencingProblem<'_>) -> Result<SequencedPlan, SequenceError> {
        if problem.vehicles.is_empty() {
            return Err(SequenceError::Model {
                message: "no vehicles to sequence".to_owned(),
            });
        }
        if problem.jobs.is_empty() {
            return Ok(SequencedPlan::default());
        }

        reject_isolated_jobs(problem)?;
        let started_at = Instant::now();
        let tours = VrpSolveContext::new(&self.config).solve(problem)?;
        reject_unusable_arcs(problem, &tours)?;
        log::debug!(
            "sequenced {} jobs into {} tours in {:?}",
            problem.jobs.len(),
            tours.len(),
            started_at.elapsed()
        );
        Ok(SequencedPlan { tours })
    }
}

/// A job no node can route to is unservable whatever its window, so it is
/// reported before the search rather than as a missed window.
fn reject_isolated_jobs(problem: &SequencingProblem<'_>) -> Result<(), SequenceError> {
    let nodes = problem.node_count();
    let isolated: Vec<&str> = (1..nodes)
        .filter(|&to| !(0..nodes).any(|from| from != to && problem.matrix.is_usable(from, to)))
        .filter_map(|node| problem.job_at(node).map(|job| job.id.as_str()))
        .collect();
    if isolated.is_empty() {
        return Ok(());
    }
    Err(SequenceError::NoSolution {
        message: format!("no route reaches job(s) {}", isolated.join(", ")),
    })
}

/// A tour that only exists through an arc without provider data is not a
/// solution.
fn reject_unusable_arcs(
    problem: &SequencingProblem<'_>,
    tours: &[VehicleTour],
) -> Result<(), SequenceError> {
    for tour in tours {
        let mut previous = 0;
        for &stop in &tour.stops {
            if !problem.matrix.is_usable(previous, stop) {
                return Err(SequenceError::NoSolution {
                    message: format!(
                        "best tour for vehicle {} needs the unroutable arc {previous} -> {stop}",
                        tour.vehicle_index
                    ),
                });
            }
            previous = stop;
        }
    }
    Ok(())
}
