//! CO2 and travel-time model for legs of travel.
//!
//! [`EmissionModel`] pairs an [`EngineSettings`] with a resolved
//! [`EnvironmentalContext`]. It is a plain value with no interior state, so a
//! sequencer may call it from any thread and at any rate.

use std::borrow::Borrow;

use crate::{EngineSettings, EnvironmentalContext, Leg, Vehicle};

/// Outcome of scoring a single leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegEmission {
    /// CO2 emitted while moving, in grams.
    pub drive_co2_g: f64,
    /// CO2 attributed to idling and crawling, in grams.
    pub idle_co2_g: f64,
    /// Congestion-adjusted travel time, in seconds.
    pub drive_time_sec: f64,
    /// Congestion-adjusted average speed, in km/h.
    pub final_speed_kmh: f64,
    /// Gradient the leg was scored with, in percent.
    pub slope_pct: f64,
}

impl LegEmission {
    /// Driving plus idling CO2.
    #[must_use]
    pub fn total_co2_g(&self) -> f64 {
        self.drive_co2_g + self.idle_co2_g
    }
}

/// Totals over a sequence of legs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteEmission {
    /// CO2 emitted while moving, in grams.
    pub co2_drive_g: f64,
    /// CO2 attributed to idling and crawling, in grams.
    pub co2_idle_g: f64,
    /// Driving plus idling CO2, in grams.
    pub co2_total_g: f64,
    /// Congestion-adjusted travel time, in seconds.
    pub total_time_sec: f64,
    /// Summed leg length, in kilometres.
    pub distance_km: f64,
    /// Distance-weighted gradient, in percent.
    pub mean_slope_pct: f64,
}

/// Emission model bound to one run's settings and environment snapshot.
///
/// # Examples
/// ```
/// use ecoroute_core::{EmissionModel, EngineSettings, EnvironmentalContext, Leg, Vehicle};
///
/// let settings = EngineSettings::default();
/// let environment = EnvironmentalContext::default();
/// let model = EmissionModel::new(&settings, &environment);
/// let truck = Vehicle::new("t1", 10_000.0, 1_000.0, 2.0).expect("valid vehicle");
///
/// let totals = model.route([Leg::new(60.0, 3_600.0)], &truck);
/// assert_eq!(totals.total_time_sec, 3_600.0);
/// assert_eq!(totals.co2_drive_g, 60_000.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EmissionModel<'a> {
    settings: &'a EngineSettings,
    environment: &'a EnvironmentalContext,
}

impl<'a> EmissionModel<'a> {
    /// Bind the model to a run.
    #[must_use]
    pub const fn new(settings: &'a EngineSettings, environment: &'a EnvironmentalContext) -> Self {
        Self {
            settings,
            environment,
        }
    }

    /// The environment snapshot this model scores against.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentalContext {
        self.environment
    }

    /// Score one leg driven by `vehicle`.
    #[must_use]
    pub fn leg(&self, leg: &Leg, vehicle: &Vehicle) -> LegEmission {
        let slope_pct = leg.slope_pct.unwrap_or(self.environment.default_slope_pct);
        if leg.distance_km.is_nan() || leg.distance_km <= 0.0 {
            return LegEmission {
                drive_co2_g: 0.0,
                idle_co2_g: 0.0,
                drive_time_sec: 0.0,
                final_speed_kmh: 0.0,
                slope_pct,
            };
        }

        let nominal_speed_kmh = if leg.duration_sec.is_finite() && leg.duration_sec > 0.0 {
            leg.distance_km / (leg.duration_sec / 3600.0)
        } else {
            self.settings.max_free_flow_speed_kmh
        };
        let final_speed_kmh = nominal_speed_kmh / self.environment.time_inflation;
        let drive_time_sec = leg.distance_km / final_speed_kmh * 3600.0;

        let drive_co2_g = leg.distance_km
            * vehicle.ef_g_per_km
            * self.load_weight(leg.load_kg, vehicle.capacity_kg)
            * self.grade_weight(slope_pct)
            * self.environment.weather_multiplier;
        let idle_co2_g = drive_time_sec
            * vehicle.idle_g_per_sec
            * (self.idle_factor(final_speed_kmh) + self.environment.idle_boost);

        LegEmission {
            drive_co2_g,
            idle_co2_g,
            drive_time_sec,
            final_speed_kmh,
            slope_pct,
        }
    }

    /// Score a sequence of legs driven by `vehicle` and sum the results.
    pub fn route<I>(&self, legs: I, vehicle: &Vehicle) -> RouteEmission
    where
        I: IntoIterator,
        I::Item: Borrow<Leg>,
    {
        let mut totals = RouteEmission::default();
        let mut slope_distance = 0.0;
        for item in legs {
            let leg = item.borrow();
            let scored = self.leg(leg, vehicle);
            totals.co2_drive_g += scored.drive_co2_g;
            totals.co2_idle_g += scored.idle_co2_g;
            totals.total_time_sec += scored.drive_time_sec;
            totals.distance_km += leg.distance_km.max(0.0);
            slope_distance += scored.slope_pct * leg.distance_km.max(0.0);
        }
        totals.co2_total_g = totals.co2_drive_g + totals.co2_idle_g;
        totals.mean_slope_pct = if totals.distance_km > 0.0 {
            slope_distance / totals.distance_km
        } else {
            self.environment.default_slope_pct
        };
        totals
    }

    /// Integer-valued search objective for a scored route.
    ///
    /// `round(scale * (co2_weight * kg CO2 + time_weight * seconds))`.
    #[must_use]
    pub fn eco_cost(&self, emission: &RouteEmission) -> u64 {
        let blended = self.settings.co2_weight * (emission.co2_total_g / 1000.0)
            + self.settings.time_weight * emission.total_time_sec;
        let scaled = (self.settings.eco_cost_scale * blended).round();
        if scaled.is_finite() && scaled > 0.0 {
            // Float-to-int `as` saturates at u64::MAX.
            scaled as u64
        } else {
            0
        }
    }

    fn load_weight(&self, load_kg: f64, capacity_kg: f64) -> f64 {
        let ratio = if capacity_kg > 0.0 {
            (load_kg.max(0.0) / capacity_kg).min(1.0)
        } else {
            0.0
        };
        1.0 + self.settings.alpha_load * ratio
    }

    fn grade_weight(&self, slope_pct: f64) -> f64 {
        1.0 + (self.settings.beta_grade * slope_pct.max(0.0)).min(self.settings.grade_cap)
    }

    fn idle_factor(&self, final_speed_kmh: f64) -> f64 {
        let threshold = self.settings.idle_speed_threshold_kmh;
        if threshold > 0.0 {
            ((threshold - final_speed_kmh) / threshold).max(0.0)
        } else {
            0.0
        }
    }
}
