//! Fallback synthesizer.
//!
//! Produces full-length, clearly tagged synthetic series when a connector cannot
//! deliver real data. Output is a pure function of the query and a seed: the
//! same signature always yields the same values.

pub mod models;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gridfeed_types::{
    EnergySource, FetchQuery, Metric, PowerBreakdown, ProviderResult, QuerySignature,
    Technology, TimeSeriesPoint,
};

/// Provider name carried by synthetic results.
pub const SYNTH_PROVIDER: &str = "gridfeed-synth";

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

/// Per-metric RNG so that adding a metric to a query leaves the others unchanged.
fn metric_rng(seed: u64, metric: Metric) -> StdRng {
    StdRng::seed_from_u64(seed ^ u64::from(metric.flag().bits()).wrapping_mul(GOLDEN))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Synthesize every metric requested by `query`, one point per hour of its window.
///
/// The result reuses `signature` so that callers can correlate it with the
/// connector call it replaces; the RNG is seeded from the signature.
#[must_use]
pub fn synthesize(query: &FetchQuery, signature: QuerySignature) -> ProviderResult {
    let seed = signature.seed();
    let points = query
        .metrics
        .metrics()
        .flat_map(|m| synthesize_metric(m, query, seed))
        .collect();
    ProviderResult::synthetic(SYNTH_PROVIDER, signature, points)
}

/// Synthesize one metric over the query window.
#[must_use]
pub fn synthesize_metric(metric: Metric, query: &FetchQuery, seed: u64) -> Vec<TimeSeriesPoint> {
    let hours: Vec<DateTime<Utc>> = query.window.hours().collect();
    let lon = query.coordinate.longitude;
    let local: Vec<f64> = hours.iter().map(|t| models::local_hour(*t, lon)).collect();
    let mut rng = metric_rng(seed, metric);

    let values: Vec<f64> = match metric {
        Metric::Price => local.iter().map(|h| models::price(*h, &mut rng)).collect(),
        Metric::LoadMw => local.iter().map(|h| models::load(*h, &mut rng)).collect(),
        Metric::CarbonIntensity => local.iter().map(|h| models::carbon(*h, &mut rng)).collect(),
        Metric::GenerationMw => generation(query, &local, &mut rng),
        Metric::Temperature => hours
            .iter()
            .zip(&local)
            .map(|(t, h)| models::temperature(*t, *h, query.coordinate.latitude, &mut rng))
            .collect(),
        Metric::Humidity => local.iter().map(|h| models::humidity(*h, &mut rng)).collect(),
        Metric::WindSpeed => {
            models::wind_speed().walk(local.len(), &mut rng, |i| models::wind_shape(local[i], 1.0))
        }
        Metric::CloudCover => cloud(local.len(), seed),
        Metric::SolarRadiation => cloud(local.len(), seed)
            .into_iter()
            .zip(&local)
            .map(|(c, h)| models::irradiance(*h, c))
            .collect(),
    };

    hours
        .into_iter()
        .zip(values)
        .map(|(ts, v)| TimeSeriesPoint::new(ts, metric, round2(v)))
        .collect()
}

// Irradiance and cloud cover share one cloud walk so they stay consistent.
fn cloud(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = metric_rng(seed, Metric::CloudCover);
    models::cloud_cover().walk(n, &mut rng, |_| 0.0)
}

fn generation(query: &FetchQuery, local: &[f64], rng: &mut StdRng) -> Vec<f64> {
    let Some(cap) = query.capacity_mw.filter(|c| *c > 0.0) else {
        let walk = models::grid_wind().walk(local.len(), rng, |i| models::wind_shape(local[i], 300.0));
        return walk;
    };
    match query.technology.unwrap_or(Technology::Hybrid) {
        Technology::Solar => local.iter().map(|h| models::solar(*h, cap, rng)).collect(),
        Technology::Wind | Technology::WindOffshore => models::farm_wind(cap)
            .walk(local.len(), rng, |i| models::wind_shape(local[i], 0.05 * cap)),
        Technology::Hydro => local.iter().map(|_| models::hydro(cap, rng)).collect(),
        Technology::Hybrid => {
            let wind = models::farm_wind(cap / 2.0).walk(local.len(), rng, |_| 0.0);
            local
                .iter()
                .zip(wind)
                .map(|(h, w)| models::solar(*h, cap / 2.0, rng) + w)
                .collect()
        }
    }
}

/// A plausible production breakdown for a hydro/nuclear-dominated grid.
#[must_use]
pub fn synthetic_breakdown(zone: &str, at: DateTime<Utc>, seed: u64) -> PowerBreakdown {
    let mut rng = StdRng::seed_from_u64(seed ^ GOLDEN.rotate_left(17));
    let total = rng.random_range(14_000.0..18_000.0);
    let daylight = models::daylight(models::local_hour(at, 15.0));
    let hydro = rng.random_range(0.40..0.55);
    let nuclear = rng.random_range(0.35..0.45);
    let wind = rng.random_range(0.05..0.15);
    let solar = daylight * rng.random_range(0.0..0.03);
    let biomass = rng.random_range(0.02..0.05);
    let gas = rng.random_range(0.0..0.02);
    let shares = [
        (EnergySource::Hydro, hydro),
        (EnergySource::Nuclear, nuclear),
        (EnergySource::Wind, wind),
        (EnergySource::Solar, solar),
        (EnergySource::Biomass, biomass),
        (EnergySource::Gas, gas),
    ];
    let sum: f64 = shares.iter().map(|(_, s)| s).sum();
    PowerBreakdown::new(
        zone,
        at,
        shares
            .into_iter()
            .map(|(src, s)| (src, round2(total * s / sum))),
    )
}
