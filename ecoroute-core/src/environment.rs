//! Per-run environmental coefficients and their resolution.
//!
//! The core never measures traffic or weather itself. A resolver turns the
//! run's reference time into an [`EnvironmentalContext`] once, before any
//! scoring happens, and that snapshot is passed explicitly to every
//! emission calculation.

use jiff::civil::DateTime;

use crate::ModelError;

/// Resolved coefficients for one planning run.
///
/// # Examples
/// ```
/// use ecoroute_core::EnvironmentalContext;
///
/// let rush_hour = EnvironmentalContext::new(1.4, 0.25, 1.05, 0.0).expect("valid coefficients");
/// assert_eq!(rush_hour.time_inflation, 1.4);
/// assert!(EnvironmentalContext::new(0.8, 0.0, 1.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentalContext {
    /// How much slower than free flow traffic moves. At least 1.
    pub time_inflation: f64,
    /// Extra idling share added to the speed-derived idle factor. At least 0.
    pub idle_boost: f64,
    /// Multiplier applied to driving emissions for weather. At least 1.
    pub weather_multiplier: f64,
    /// Gradient assumed for legs whose slope is unknown, in percent.
    pub default_slope_pct: f64,
}

impl Default for EnvironmentalContext {
    fn default() -> Self {
        Self {
            time_inflation: 1.0,
            idle_boost: 0.0,
            weather_multiplier: 1.0,
            default_slope_pct: 0.0,
        }
    }
}

impl EnvironmentalContext {
    /// Validates and constructs an [`EnvironmentalContext`].
    pub fn new(
        time_inflation: f64,
        idle_boost: f64,
        weather_multiplier: f64,
        default_slope_pct: f64,
    ) -> Result<Self, ModelError> {
        let context = Self {
            time_inflation,
            idle_boost,
            weather_multiplier,
            default_slope_pct,
        };
        context.validate()?;
        Ok(context)
    }

    /// Check every coefficient lies in its allowed range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let checks = [
            ("time_inflation", self.time_inflation, 1.0, ">= 1"),
            ("idle_boost", self.idle_boost, 0.0, ">= 0"),
            ("weather_multiplier", self.weather_multiplier, 1.0, ">= 1"),
        ];
        for (field, value, min, expected) in checks {
            if !value.is_finite() || value < min {
                return Err(ModelError::InvalidEnvironment {
                    field,
                    expected,
                    value,
                });
            }
        }
        if !self.default_slope_pct.is_finite() {
            return Err(ModelError::InvalidEnvironment {
                field: "default_slope_pct",
                expected: "finite",
                value: self.default_slope_pct,
            });
        }
        Ok(())
    }
}

/// Supplies the environment snapshot for a run's reference time.
pub trait EnvironmentResolver {
    /// Resolve coefficients for a run starting at `reference_time`.
    fn resolve(&self, reference_time: DateTime) -> EnvironmentalContext;
}

/// Resolver returning the same coefficients for every run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedEnvironment(pub EnvironmentalContext);

impl EnvironmentResolver for FixedEnvironment {
    fn resolve(&self, _reference_time: DateTime) -> EnvironmentalContext {
        self.0
    }
}

/// Congestion coefficients for one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CongestionFactors {
    /// Free-flow speed divided by observed speed, floored at 1.
    pub time_inflation: f64,
    /// Share of observations at or below the idle threshold.
    pub idle_boost: f64,
}

impl Default for CongestionFactors {
    fn default() -> Self {
        Self {
            time_inflation: 1.0,
            idle_boost: 0.0,
        }
    }
}

impl CongestionFactors {
    /// Derive factors from observed segment speeds.
    ///
    /// With no observations the factors are neutral.
    ///
    /// # Examples
    /// ```
    /// use ecoroute_core::CongestionFactors;
    ///
    /// let factors = CongestionFactors::from_speed_samples(60.0, &[30.0, 10.0, 50.0], 15.0);
    /// assert_eq!(factors.time_inflation, 2.0);
    /// assert!((factors.idle_boost - 1.0 / 3.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn from_speed_samples(
        free_flow_kmh: f64,
        observed_kmh: &[f64],
        idle_threshold_kmh: f64,
    ) -> Self {
        if observed_kmh.is_empty() {
            return Self::default();
        }
        let count = observed_kmh.len() as f64;
        let mean_observed = (observed_kmh.iter().sum::<f64>() / count).max(1e-3);
        let time_inflation = (free_flow_kmh.max(1e-3) / mean_observed).max(1.0);
        let slow = observed_kmh
            .iter()
            .filter(|&&speed| speed <= idle_threshold_kmh)
            .count() as f64;
        Self {
            time_inflation,
            idle_boost: slow / count,
        }
    }
}

/// Hour-of-day congestion table plus run-wide weather and slope values.
///
/// # Examples
/// ```
/// use jiff::civil::date;
/// use ecoroute_core::{CongestionFactors, EnvironmentResolver, HourlyEnvironmentProfile};
///
/// let profile = HourlyEnvironmentProfile::neutral()
///     .with_hour(8, CongestionFactors { time_inflation: 1.5, idle_boost: 0.2 });
/// let context = profile.resolve(date(2025, 10, 15).at(8, 45, 0, 0));
/// assert_eq!(context.time_inflation, 1.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HourlyEnvironmentProfile {
    /// Factors indexed by hour, 0 to 23.
    pub hours: [CongestionFactors; 24],
    /// Weather multiplier applied to every hour.
    pub weather_multiplier: f64,
    /// Default slope applied to every hour.
    pub default_slope_pct: f64,
}

impl HourlyEnvironmentProfile {
    /// A profile with no congestion, neutral weather, and flat roads.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            hours: [CongestionFactors::default(); 24],
            weather_multiplier: 1.0,
            default_slope_pct: 0.0,
        }
    }

    /// Replace the factors for `hour`. Hours past 23 are ignored.
    #[must_use]
    pub fn with_hour(mut self, hour: usize, factors: CongestionFactors) -> Self {
        if let Some(slot) = self.hours.get_mut(hour) {
            *slot = factors;
        }
        self
    }

    /// Check every hour resolves to a valid context.
    pub fn validate(&self) -> Result<(), ModelError> {
        for factors in &self.hours {
            self.context_for(*factors).validate()?;
        }
        Ok(())
    }

    const fn context_for(&self, factors: CongestionFactors) -> EnvironmentalContext {
        EnvironmentalContext {
            time_inflation: factors.time_inflation,
            idle_boost: factors.idle_boost,
            weather_multiplier: self.weather_multiplier,
            default_slope_pct: self.default_slope_pct,
        }
    }
}

impl EnvironmentResolver for HourlyEnvironmentProfile {
    fn resolve(&self, reference_time: DateTime) -> EnvironmentalContext {
        let factors = usize::try_from(reference_time.hour())
            .ok()
            .and_then(|hour| self.hours.get(hour))
            .copied()
            .unwrap_or_default();
        self.context_for(factors)
    }
}
