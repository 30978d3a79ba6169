//! Fixture documents and filesystem helpers for CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use ecoroute_core::test_support::StubRoutingProvider;
use ecoroute_core::{ProviderRoute, RouteCandidate, RoutingProvider};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::CliError;
use crate::plan::{PlanBackends, PlanConfig};

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture file");
}

pub(super) fn temp_root() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

/// One 100 kg delivery from Gunsan to Busan, due by 18:00.
pub(super) fn busan_request() -> Value {
    json!({
        "run_id": "run-7",
        "depot": { "latitude": 35.94, "longitude": 126.68 },
        "run_reference_time": "2025-10-15T08:00:00",
        "jobs": [{
            "id": "busan",
            "location": { "latitude": 35.09, "longitude": 128.82 },
            "demand_kg": 100.0,
            "tw_start": "2025-10-15T08:00:00",
            "tw_end": "2025-10-15T18:00:00"
        }],
        "vehicles": [{ "id": "truck", "capacity_kg": 25000.0, "ef_g_per_km": 1200.0 }]
    })
}

fn candidate(label: &str, priority: u32, distance_km: f64, time_sec: f64) -> RouteCandidate {
    RouteCandidate {
        label: label.to_owned(),
        priority,
        provider: "stub".to_owned(),
        route: ProviderRoute::new(distance_km, time_sec),
        polyline: None,
    }
}

/// Routing that offers a 320 km primary and a 305 km alternative.
pub(super) struct StubBackends;

impl PlanBackends for StubBackends {
    fn routing(
        &self,
        _config: &PlanConfig,
    ) -> Result<Box<dyn RoutingProvider + Send + Sync>, CliError> {
        Ok(Box::new(StubRoutingProvider::default().with_candidates(vec![
            candidate("primary", 0, 320.0, 14_400.0),
            candidate("alternative-1", 1, 305.0, 15_200.0),
        ])))
    }
}
