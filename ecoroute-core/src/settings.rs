//! Engine tuning knobs.

use std::time::Duration;

/// Tuning values passed explicitly into every planning call.
///
/// Two runs with different settings never interfere: nothing here is read
/// from global state.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use ecoroute_core::EngineSettings;
///
/// let settings = EngineSettings::default()
///     .with_weights(0.5, 0.5)
///     .with_search_time_limit(Duration::from_secs(2));
/// assert_eq!(settings.co2_weight, 0.5);
/// assert_eq!(settings.search_time_limit(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineSettings {
    /// Emission uplift at full payload (`load_w = 1 + alpha * ratio`).
    pub alpha_load: f64,
    /// Emission uplift per percent of uphill gradient.
    pub beta_grade: f64,
    /// Ceiling on the gradient uplift.
    pub grade_cap: f64,
    /// Speed below which a vehicle is treated as partly idling, in km/h.
    pub idle_speed_threshold_kmh: f64,
    /// Speed assumed when a leg carries no usable duration, in km/h.
    pub max_free_flow_speed_kmh: f64,
    /// Weight of CO2 kilograms in the eco-cost.
    pub co2_weight: f64,
    /// Weight of travel seconds in the eco-cost.
    pub time_weight: f64,
    /// Multiplier turning the blended eco-cost into an integer objective.
    pub eco_cost_scale: f64,
    /// Wall-clock budget for the multi-stop search, in seconds.
    pub search_time_limit_secs: u64,
    /// Latest time any vehicle may still be travelling, in seconds.
    pub horizon_sec: u32,
    /// Diesel emission intensity, in kg CO2 per US gallon.
    pub diesel_kg_co2_per_gallon: f64,
    /// Diesel burned while idling, in US gallons per hour.
    pub idle_fuel_gallons_per_hour: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            alpha_load: 0.10,
            beta_grade: 0.03,
            grade_cap: 0.30,
            idle_speed_threshold_kmh: 15.0,
            max_free_flow_speed_kmh: 90.0,
            co2_weight: 0.8,
            time_weight: 0.2,
            eco_cost_scale: 1000.0,
            search_time_limit_secs: 10,
            horizon_sec: crate::DAY_SECONDS,
            diesel_kg_co2_per_gallon: 10.19,
            idle_fuel_gallons_per_hour: 0.8,
        }
    }
}

impl EngineSettings {
    /// Set the CO2 and time weights of the eco-cost.
    #[must_use]
    pub const fn with_weights(mut self, co2_weight: f64, time_weight: f64) -> Self {
        self.co2_weight = co2_weight;
        self.time_weight = time_weight;
        self
    }

    /// Set the multi-stop search budget. Sub-second budgets round up to one
    /// second.
    #[must_use]
    pub fn with_search_time_limit(mut self, limit: Duration) -> Self {
        let secs = if limit.subsec_nanos() > 0 {
            limit.as_secs().saturating_add(1)
        } else {
            limit.as_secs()
        };
        self.search_time_limit_secs = secs.max(1);
        self
    }

    /// The multi-stop search budget, never shorter than one second.
    #[must_use]
    pub const fn search_time_limit(&self) -> Duration {
        if self.search_time_limit_secs == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.search_time_limit_secs)
        }
    }
}
