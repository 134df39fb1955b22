//! Deterministic curve models behind the synthesizer.
//!
//! Every model takes local hours and an explicit RNG; nothing here reads the
//! clock or global state.

use core::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;

/// Local mean solar hour in `[0, 24)` for a UTC instant and longitude.
#[must_use]
pub fn local_hour(ts: DateTime<Utc>, longitude: f64) -> f64 {
    let utc = f64::from(ts.hour()) + f64::from(ts.minute()) / 60.0;
    (utc + longitude / 15.0).rem_euclid(24.0)
}

/// Bell-shaped daylight factor in `[0, 1]`: zero from 18:00 to 06:00, peak at noon.
#[must_use]
pub fn daylight(h: f64) -> f64 {
    ((h - 6.0) * PI / 12.0).sin().max(0.0)
}

fn is_morning_peak(h: f64) -> bool {
    (7.0..10.0).contains(&h)
}

fn is_evening_peak(h: f64) -> bool {
    (17.0..21.0).contains(&h)
}

fn is_night(h: f64) -> bool {
    !(7.0..23.0).contains(&h)
}

/// Day-ahead price in EUR/MWh: diurnal swing, morning/evening peaks, night discount.
pub fn price<R: Rng + ?Sized>(h: f64, rng: &mut R) -> f64 {
    let mut p = 45.0 + ((h - 6.0) * PI / 12.0).sin() * 15.0;
    if is_morning_peak(h) || is_evening_peak(h) {
        p += 10.0;
    }
    if is_night(h) {
        p -= 8.0;
    }
    p + rng.random_range(0.0..8.0)
}

/// Grid load in MW with morning and evening peaks.
pub fn load<R: Rng + ?Sized>(h: f64, rng: &mut R) -> f64 {
    let mut l = 12_000.0;
    if is_morning_peak(h) {
        l += 2_000.0;
    }
    if is_evening_peak(h) {
        l += 2_500.0;
    }
    if is_night(h) {
        l -= 2_000.0;
    }
    l + rng.random_range(-250.0..250.0)
}

/// Solar output in MW for a plant of `capacity_mw`.
///
/// Performance ratio 0.7 and inverter efficiency 0.9, with ±10% weather noise.
pub fn solar<R: Rng + ?Sized>(h: f64, capacity_mw: f64, rng: &mut R) -> f64 {
    let d = daylight(h);
    if d == 0.0 {
        return 0.0;
    }
    d * capacity_mw * 0.7 * 0.9 * rng.random_range(0.9..1.1)
}

/// Parameters of a mean-reverting (discrete Ornstein-Uhlenbeck) walk.
#[derive(Debug, Clone, Copy)]
pub struct Reverting {
    /// Long-run mean.
    pub mean: f64,
    /// Pull towards the mean per step, in `(0, 1]`.
    pub theta: f64,
    /// Noise amplitude per step.
    pub sigma: f64,
    /// Lower clamp.
    pub floor: f64,
    /// Upper clamp.
    pub ceil: f64,
}

impl Reverting {
    /// Walk `n` steps starting near the mean; `shape` adds a deterministic term per step.
    pub fn walk<R, F>(&self, n: usize, rng: &mut R, shape: F) -> Vec<f64>
    where
        R: Rng + ?Sized,
        F: Fn(usize) -> f64,
    {
        let mut x = self.mean + self.sigma * (rng.random::<f64>() - 0.5) * 2.0;
        (0..n)
            .map(|i| {
                x += self.theta * (self.mean - x) + self.sigma * (rng.random::<f64>() - 0.5) * 2.0;
                (x + shape(i)).clamp(self.floor, self.ceil)
            })
            .collect()
    }
}

/// Grid-scale wind generation in MW (no site capacity known).
#[must_use]
pub const fn grid_wind() -> Reverting {
    Reverting {
        mean: 2_500.0,
        theta: 0.3,
        sigma: 500.0,
        floor: 100.0,
        ceil: f64::MAX,
    }
}

/// Wind generation in MW for a farm of `capacity_mw`.
#[must_use]
pub fn farm_wind(capacity_mw: f64) -> Reverting {
    Reverting {
        mean: 0.35 * capacity_mw,
        theta: 0.3,
        sigma: 0.08 * capacity_mw,
        floor: 0.03 * capacity_mw,
        ceil: capacity_mw,
    }
}

/// Diurnal wind modulation used on top of a wind walk.
#[must_use]
pub fn wind_shape(h: f64, amplitude: f64) -> f64 {
    (h * PI / 8.0).sin() * amplitude
}

/// Hydro output in MW: steady dispatch around 60% of capacity.
pub fn hydro<R: Rng + ?Sized>(capacity_mw: f64, rng: &mut R) -> f64 {
    capacity_mw * rng.random_range(0.55..0.65)
}

/// Carbon intensity in gCO2eq/kWh for a hydro/nuclear-dominated grid.
pub fn carbon<R: Rng + ?Sized>(h: f64, rng: &mut R) -> f64 {
    (50.0 + (h * PI / 12.0).sin() * 20.0 + rng.random_range(-15.0..15.0)).max(20.0)
}

/// Seasonal baseline temperature in °C for a latitude and day of year.
#[must_use]
pub fn seasonal_temperature(ts: DateTime<Utc>, latitude: f64) -> f64 {
    let doy = f64::from(ts.ordinal());
    let season = ((doy - 110.0) / 365.0 * 2.0 * PI).sin();
    let base = 14.0 - (latitude.abs() - 45.0) * 0.4;
    base + season * 10.0
}

/// Air temperature in °C: seasonal baseline plus a diurnal swing peaking mid-afternoon.
pub fn temperature<R: Rng + ?Sized>(ts: DateTime<Utc>, h: f64, latitude: f64, rng: &mut R) -> f64 {
    seasonal_temperature(ts, latitude) + ((h - 9.0) * PI / 12.0).sin() * 5.0
        + rng.random_range(-1.0..1.0)
}

/// Relative humidity in %: inverse of the temperature swing.
pub fn humidity<R: Rng + ?Sized>(h: f64, rng: &mut R) -> f64 {
    (75.0 - ((h - 9.0) * PI / 12.0).sin() * 15.0 + rng.random_range(-5.0..5.0)).clamp(0.0, 100.0)
}

/// Cloud cover in %.
#[must_use]
pub const fn cloud_cover() -> Reverting {
    Reverting {
        mean: 60.0,
        theta: 0.25,
        sigma: 12.0,
        floor: 0.0,
        ceil: 100.0,
    }
}

/// Near-surface wind speed in m/s.
#[must_use]
pub const fn wind_speed() -> Reverting {
    Reverting {
        mean: 5.0,
        theta: 0.3,
        sigma: 1.2,
        floor: 0.0,
        ceil: 40.0,
    }
}

/// Global horizontal irradiance in W/m², attenuated by cloud cover.
#[must_use]
pub fn irradiance(h: f64, cloud_pct: f64) -> f64 {
    daylight(h) * 800.0 * (1.0 - 0.75 * (cloud_pct / 100.0).clamp(0.0, 1.0))
}
