//! Hourly environment profiles stored as JSON.
//!
//! A profile file lists congestion for the hours that need it; every other
//! hour is free-flowing. Each hour either states its factors directly or
//! gives raw speed observations to derive them from:
//!
//! ```json
//! {
//!   "weather_multiplier": 1.1,
//!   "default_slope_pct": 0.5,
//!   "hours": {
//!     "8": { "time_inflation": 1.6, "idle_boost": 0.25 },
//!     "18": { "free_flow_kmh": 70.0, "observed_kmh": [22.0, 9.0, 35.0] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use ecoroute_core::{CongestionFactors, EngineSettings, HourlyEnvironmentProfile, ModelError};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading an environment profile.
#[derive(Debug, Error)]
pub enum EnvironmentLoadError {
    /// The file could not be read.
    #[error("failed to read environment profile {path:?}")]
    Read {
        /// Profile path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid profile document.
    #[error("failed to parse environment profile {path:?}")]
    Parse {
        /// Profile path.
        path: Utf8PathBuf,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// An hour key is past 23.
    #[error("environment profile {path:?} lists hour {hour}, expected 0 to 23")]
    HourOutOfRange {
        /// Profile path.
        path: Utf8PathBuf,
        /// Offending hour.
        hour: u8,
    },
    /// A resolved coefficient is out of range.
    #[error("environment profile {path:?} is invalid")]
    Invalid {
        /// Profile path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: ModelError,
    },
}

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(default = "neutral_weather")]
    weather_multiplier: f64,
    #[serde(default)]
    default_slope_pct: f64,
    #[serde(default)]
    hours: BTreeMap<u8, HourEntry>,
}

const fn neutral_weather() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HourEntry {
    Factors(CongestionFactors),
    Samples {
        free_flow_kmh: f64,
        observed_kmh: Vec<f64>,
    },
}

impl HourEntry {
    fn resolve(&self, idle_threshold_kmh: f64) -> CongestionFactors {
        match self {
            Self::Factors(factors) => *factors,
            Self::Samples {
                free_flow_kmh,
                observed_kmh,
            } => CongestionFactors::from_speed_samples(
                *free_flow_kmh,
                observed_kmh,
                idle_threshold_kmh,
            ),
        }
    }
}

/// Load and validate the profile at `path`.
///
/// Speed observations are turned into factors with the idle threshold from
/// `settings`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, lists an hour
/// past 23, or resolves to coefficients out of range.
pub fn load_environment_profile(
    path: &Utf8Path,
    settings: &EngineSettings,
) -> Result<HourlyEnvironmentProfile, EnvironmentLoadError> {
    let contents = read_profile(path)?;
    parse_environment_profile(&contents, settings).map_err(|err| err.at(path))
}

/// Parse a profile document already in memory.
///
/// # Errors
///
/// As [`load_environment_profile`], with an empty path in the error.
pub fn parse_environment_profile(
    contents: &str,
    settings: &EngineSettings,
) -> Result<HourlyEnvironmentProfile, EnvironmentLoadError> {
    let document: ProfileDocument =
        serde_json::from_str(contents).map_err(|source| EnvironmentLoadError::Parse {
            path: Utf8PathBuf::new(),
            source,
        })?;

    let mut profile = HourlyEnvironmentProfile {
        weather_multiplier: document.weather_multiplier,
        default_slope_pct: document.default_slope_pct,
        ..HourlyEnvironmentProfile::neutral()
    };
    for (hour, entry) in &document.hours {
        if *hour > 23 {
            return Err(EnvironmentLoadError::HourOutOfRange {
                path: Utf8PathBuf::new(),
                hour: *hour,
            });
        }
        profile = profile.with_hour(
            usize::from(*hour),
            entry.resolve(settings.idle_speed_threshold_kmh),
        );
    }
    profile
        .validate()
        .map_err(|source| EnvironmentLoadError::Invalid {
            path: Utf8PathBuf::new(),
            source,
        })?;
    log::debug!("loaded environment profile with {} congested hours", document.hours.len());
    Ok(profile)
}

impl EnvironmentLoadError {
    fn at(self, path: &Utf8Path) -> Self {
        let path = path.to_path_buf();
        match self {
            Self::Read { source, .. } => Self::Read { path, source },
            Self::Parse { source, .. } => Self::Parse { path, source },
            Self::HourOutOfRange { hour, .. } => Self::HourOutOfRange { path, hour },
            Self::Invalid { source, .. } => Self::Invalid { path, source },
        }
    }
}

fn read_profile(path: &Utf8Path) -> Result<String, EnvironmentLoadError> {
    let read_error = |source| EnvironmentLoadError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path does not name a file",
        ))
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(read_error)?
        .read_to_string(file_name)
        .map_err(read_error)
}
