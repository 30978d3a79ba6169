//! Test-only utilities for `ecoroute-solver-vrp`.
//!
//! The helpers in this module are available to unit tests, behavioural
//! tests, and benchmarks. They are gated behind the `test-support` feature
//! (and `cfg(test)`).

use std::time::Duration;

use ecoroute_core::{EngineSettings, Job, Location, TimeWindow, Vehicle};

use crate::{VrpSequencer, VrpSequencerConfig};

/// Construct an unconstrained delivery job.
///
/// # Examples
/// ```rust
/// use ecoroute_solver_vrp::test_support::job;
///
/// let job = job("j1", 35.1, 129.0, 120.0);
/// assert_eq!(job.time_window.end, 86_400);
/// ```
#[must_use]
pub fn job(id: &str, latitude: f64, longitude: f64, demand_kg: f64) -> Job {
    Job {
        id: id.to_owned(),
        location: Location {
            latitude,
            longitude,
        },
        demand_kg,
        time_window: TimeWindow::unconstrained(),
    }
}

/// Construct a delivery job that must be reached within `[start, end]`.
#[must_use]
pub fn windowed_job(
    id: &str,
    latitude: f64,
    longitude: f64,
    demand_kg: f64,
    start: u32,
    end: u32,
) -> Job {
    Job {
        time_window: TimeWindow { start, end },
        ..job(id, latitude, longitude, demand_kg)
    }
}

/// Construct a vehicle emitting `ef_g_per_km` and idling at 5 g/s.
#[must_use]
pub fn vehicle(id: &str, capacity_kg: f64, ef_g_per_km: f64) -> Vehicle {
    Vehicle {
        id: id.to_owned(),
        capacity_kg,
        ef_g_per_km,
        idle_g_per_sec: 5.0,
    }
}

/// Engine settings with a short search budget suitable for tests.
#[must_use]
pub fn quick_settings() -> EngineSettings {
    EngineSettings::default().with_search_time_limit(Duration::from_secs(2))
}

/// Sequencer limited to a few hundred generations.
#[must_use]
pub const fn quick_sequencer() -> VrpSequencer {
    VrpSequencer::with_config(VrpSequencerConfig {
        max_generations: 200,
    })
}
