//! JSON plan request documents.
//!
//! The on-disk request mirrors [`PlanRequest`] but lets jobs state their
//! window as absolute datetimes and lets vehicles omit their idle rate.
//! Converting a document validates every job and vehicle.

use camino::Utf8Path;
use ecoroute_core::{
    EngineSettings, EnvironmentalContext, Job, Location, ModelError, PlanRequest, TimeWindow,
    Vehicle,
};
use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};
use std::io::BufReader;

use crate::CliError;
use crate::fs::open_utf8_file;

/// A plan request as written by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RequestDocument {
    pub(crate) run_id: String,
    #[serde(default)]
    pub(crate) depot: Option<Location>,
    #[serde(default)]
    pub(crate) jobs: Vec<JobDocument>,
    #[serde(default)]
    pub(crate) vehicles: Vec<VehicleDocument>,
    pub(crate) run_reference_time: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) environment: Option<EnvironmentalContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct JobDocument {
    pub(crate) id: String,
    pub(crate) location: Location,
    pub(crate) demand_kg: f64,
    /// Window as second offsets; wins over `tw_start`/`tw_end`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tw_start: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tw_end: Option<DateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VehicleDocument {
    pub(crate) id: String,
    pub(crate) capacity_kg: f64,
    pub(crate) ef_g_per_km: f64,
    /// Derived from diesel burn when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) idle_g_per_sec: Option<f64>,
}

impl JobDocument {
    fn into_job(self, reference: DateTime) -> Result<Job, ModelError> {
        let window = match self.time_window {
            Some(window) => TimeWindow::new(window.start, window.end)?,
            None => TimeWindow::from_datetimes(self.tw_start, self.tw_end, reference),
        };
        Ok(Job::new(self.id, self.location, self.demand_kg)?.with_time_window(window))
    }
}

impl VehicleDocument {
    fn into_vehicle(self, settings: &EngineSettings) -> Result<Vehicle, ModelError> {
        match self.idle_g_per_sec {
            Some(idle) => Vehicle::new(self.id, self.capacity_kg, self.ef_g_per_km, idle),
            None => {
                Vehicle::with_fuel_idle_rate(self.id, self.capacity_kg, self.ef_g_per_km, settings)
            }
        }
    }
}

impl RequestDocument {
    /// Validate the document and build the planner's request.
    pub(crate) fn into_plan_request(
        self,
        settings: &EngineSettings,
    ) -> Result<PlanRequest, ModelError> {
        let reference = self.run_reference_time;
        if let Some(depot) = &self.depot {
            depot.validate()?;
        }
        if let Some(environment) = &self.environment {
            environment.validate()?;
        }
        let jobs = self
            .jobs
            .into_iter()
            .map(|job| job.into_job(reference))
            .collect::<Result<Vec<_>, _>>()?;
        let vehicles = self
            .vehicles
            .into_iter()
            .map(|vehicle| vehicle.into_vehicle(settings))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlanRequest {
            run_id: self.run_id,
            depot: self.depot,
            jobs,
            vehicles,
            run_reference_time: reference,
            environment: self.environment,
        })
    }
}

/// Loads a JSON-encoded [`RequestDocument`] from disk.
pub(crate) fn load_request_document(path: &Utf8Path) -> Result<RequestDocument, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenPlanRequest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParsePlanRequest {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads JSON-encoded [`EngineSettings`]; missing fields keep their defaults
/// and a zero search budget is raised to one second.
pub(crate) fn load_settings(path: &Utf8Path) -> Result<EngineSettings, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenSettings {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: EngineSettings = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| CliError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })?;
    settings.search_time_limit_secs = settings.search_time_limit_secs.max(1);
    Ok(settings)
}
