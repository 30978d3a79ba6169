//! Domain records shared by every stage of a planning run.
//!
//! Constructors validate their inputs and return `Result` so that malformed
//! jobs or vehicles are rejected before any routing data is fetched.

use jiff::civil::DateTime;

use crate::{EngineSettings, ModelError};

/// Length of the planning day in seconds.
///
/// Time windows default to `[0, DAY_SECONDS]`, which leaves a job
/// unconstrained for the run's day.
pub const DAY_SECONDS: u32 = 86_400;

/// A WGS84 position.
///
/// # Examples
/// ```
/// use ecoroute_core::Location;
///
/// let depot = Location::new(35.94, 126.68).expect("valid coordinates");
/// assert_eq!(depot.latitude, 35.94);
/// assert!(Location::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Latitude in degrees, within `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub longitude: f64,
}

impl Location {
    /// Validates and constructs a [`Location`].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ModelError> {
        let location = Self {
            latitude,
            longitude,
        };
        location.validate()?;
        Ok(location)
    }

    /// Check the coordinates lie on the globe.
    pub fn validate(&self) -> Result<(), ModelError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ModelError::InvalidLocation {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Allowed arrival interval, in whole seconds from the run's reference time.
///
/// # Examples
/// ```
/// use ecoroute_core::{DAY_SECONDS, TimeWindow};
///
/// let window = TimeWindow::new(3_600, 7_200).expect("ordered bounds");
/// assert!(window.contains(5_000.0));
/// assert!(!window.contains(7_201.0));
/// assert_eq!(TimeWindow::default().end, DAY_SECONDS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeWindow {
    /// Earliest arrival offset.
    pub start: u32,
    /// Latest arrival offset.
    pub end: u32,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::unconstrained()
    }
}

impl TimeWindow {
    /// Validates and constructs a [`TimeWindow`].
    pub const fn new(start: u32, end: u32) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::InvertedTimeWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole planning day.
    #[must_use]
    pub const fn unconstrained() -> Self {
        Self {
            start: 0,
            end: DAY_SECONDS,
        }
    }

    /// Convert absolute delivery bounds into offsets from `reference`.
    ///
    /// Bounds before the reference time clamp to zero. A missing bound or an
    /// end earlier than the start yields [`TimeWindow::unconstrained`].
    ///
    /// # Examples
    /// ```
    /// use jiff::civil::date;
    /// use ecoroute_core::TimeWindow;
    ///
    /// let reference = date(2025, 10, 15).at(8, 0, 0, 0);
    /// let window = TimeWindow::from_datetimes(
    ///     Some(date(2025, 10, 15).at(9, 0, 0, 0)),
    ///     Some(date(2025, 10, 15).at(12, 30, 0, 0)),
    ///     reference,
    /// );
    /// assert_eq!((window.start, window.end), (3_600, 16_200));
    /// ```
    #[must_use]
    pub fn from_datetimes(
        start: Option<DateTime>,
        end: Option<DateTime>,
        reference: DateTime,
    ) -> Self {
        let (Some(start_at), Some(end_at)) = (start, end) else {
            return Self::unconstrained();
        };
        let start_offset = seconds_after(start_at, reference);
        let end_offset = seconds_after(end_at, reference);
        Self::new(start_offset, end_offset).unwrap_or_else(|_| Self::unconstrained())
    }

    /// Whether an arrival at `offset_sec` honours the window.
    #[must_use]
    pub fn contains(&self, offset_sec: f64) -> bool {
        offset_sec >= f64::from(self.start) && offset_sec <= f64::from(self.end)
    }
}

fn seconds_after(at: DateTime, reference: DateTime) -> u32 {
    let seconds = at.duration_since(reference).as_secs().max(0);
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

/// A delivery stop.
///
/// Jobs are immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    /// Caller-assigned identifier, echoed in assignments.
    pub id: String,
    /// Delivery location.
    pub location: Location,
    /// Quantity delivered, in kilograms.
    pub demand_kg: f64,
    /// Allowed arrival window.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_window: TimeWindow,
}

impl Job {
    /// Validates and constructs an unconstrained [`Job`].
    pub fn new(
        id: impl Into<String>,
        location: Location,
        demand_kg: f64,
    ) -> Result<Self, ModelError> {
        let job = Self {
            id: id.into(),
            location,
            demand_kg,
            time_window: TimeWindow::unconstrained(),
        };
        job.validate()?;
        Ok(job)
    }

    /// Replace the arrival window.
    #[must_use]
    pub const fn with_time_window(mut self, time_window: TimeWindow) -> Self {
        self.time_window = time_window;
        self
    }

    /// Check demand, location, and window are well formed.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.location.validate()?;
        if !self.demand_kg.is_finite() || self.demand_kg < 0.0 {
            return Err(ModelError::NegativeDemand {
                job_id: self.id.clone(),
                demand_kg: self.demand_kg,
            });
        }
        TimeWindow::new(self.time_window.start, self.time_window.end)?;
        Ok(())
    }
}

/// A delivery vehicle and its emission profile.
///
/// # Examples
/// ```
/// use ecoroute_core::Vehicle;
///
/// let truck = Vehicle::new("82-1234", 25_000.0, 1_200.0, 10.0).expect("valid vehicle");
/// assert_eq!(truck.capacity_kg, 25_000.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vehicle {
    /// Caller-assigned identifier, echoed in assignments.
    pub id: String,
    /// Payload limit in kilograms.
    pub capacity_kg: f64,
    /// CO2 emitted per kilometre driven, in grams.
    pub ef_g_per_km: f64,
    /// CO2 emitted per second spent idling or crawling, in grams.
    pub idle_g_per_sec: f64,
}

impl Vehicle {
    /// Validates and constructs a [`Vehicle`].
    pub fn new(
        id: impl Into<String>,
        capacity_kg: f64,
        ef_g_per_km: f64,
        idle_g_per_sec: f64,
    ) -> Result<Self, ModelError> {
        let vehicle = Self {
            id: id.into(),
            capacity_kg,
            ef_g_per_km,
            idle_g_per_sec,
        };
        vehicle.validate()?;
        Ok(vehicle)
    }

    /// Construct a vehicle whose idle rate is derived from diesel burn.
    ///
    /// The idle rate is `kg CO2 per gallon * 1000 * gallons per hour / 3600`,
    /// taking both figures from `settings`.
    ///
    /// # Examples
    /// ```
    /// use ecoroute_core::{EngineSettings, Vehicle};
    ///
    /// let settings = EngineSettings::default();
    /// let truck = Vehicle::with_fuel_idle_rate("t1", 8_000.0, 900.0, &settings)
    ///     .expect("valid vehicle");
    /// assert!((truck.idle_g_per_sec - 2.2644).abs() < 1e-3);
    /// ```
    pub fn with_fuel_idle_rate(
        id: impl Into<String>,
        capacity_kg: f64,
        ef_g_per_km: f64,
        settings: &EngineSettings,
    ) -> Result<Self, ModelError> {
        let idle_g_per_sec = settings.diesel_kg_co2_per_gallon
            * 1000.0
            * settings.idle_fuel_gallons_per_hour
            / 3600.0;
        Self::new(id, capacity_kg, ef_g_per_km, idle_g_per_sec)
    }

    /// Check every rate is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("capacity_kg", self.capacity_kg),
            ("ef_g_per_km", self.ef_g_per_km),
            ("idle_g_per_sec", self.idle_g_per_sec),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidVehicle {
                    vehicle_id: self.id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// One contiguous stretch of travel.
///
/// Legs come from the routing provider without a load; callers attach the
/// carried load with [`Leg::carrying`] before scoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leg {
    /// Length in kilometres.
    pub distance_km: f64,
    /// Free-flow duration in seconds. Zero means unknown.
    pub duration_sec: f64,
    /// Road gradient in percent, when the provider knows it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub slope_pct: Option<f64>,
    /// Load on board while driving this leg, in kilograms.
    #[cfg_attr(feature = "serde", serde(default))]
    pub load_kg: f64,
    /// Provider-specific road link identifier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub link_id: Option<String>,
}

impl Leg {
    /// An unloaded leg with unknown slope.
    #[must_use]
    pub const fn new(distance_km: f64, duration_sec: f64) -> Self {
        Self {
            distance_km,
            duration_sec,
            slope_pct: None,
            load_kg: 0.0,
            link_id: None,
        }
    }

    /// Attach a known gradient.
    #[must_use]
    pub const fn with_slope(mut self, slope_pct: f64) -> Self {
        self.slope_pct = Some(slope_pct);
        self
    }

    /// Attach the provider's link identifier.
    #[must_use]
    pub fn with_link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_id = Some(link_id.into());
        self
    }

    /// Copy of this leg carrying `load_kg`.
    #[must_use]
    pub fn carrying(&self, load_kg: f64) -> Self {
        Self {
            load_kg,
            ..self.clone()
        }
    }
}
