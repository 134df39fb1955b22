use chrono::{DateTime, Timelike, Utc};
use gridfeed_core::{
    Coordinate, EnergySource, Metric, PowerBreakdown, Site, SiteStatus, Technology,
};

/// Fixture value for `metric` at `ts`; varies with the hour of day only.
#[must_use]
pub fn fixture_value(metric: Metric, ts: DateTime<Utc>) -> f64 {
    let h = f64::from(ts.hour());
    match metric {
        Metric::Price => 40.0 + h,
        Metric::GenerationMw => 100.0 + 2.0 * h,
        Metric::LoadMw => 10_000.0 + 10.0 * h,
        Metric::CarbonIntensity => 85.0,
        Metric::Temperature => 15.0,
        Metric::WindSpeed => 5.0,
        Metric::SolarRadiation => 300.0,
        Metric::CloudCover => 40.0,
        Metric::Humidity => 70.0,
    }
}

/// Two fixture sites.
#[must_use]
pub fn fixture_sites() -> Vec<Site> {
    vec![
        Site {
            id: "mock-001".into(),
            name: "Mock Solar".into(),
            coordinate: Coordinate {
                latitude: 59.33,
                longitude: 18.07,
            },
            capacity_mw: 10.0,
            technology: Technology::Solar,
            status: SiteStatus::Active,
        },
        Site {
            id: "mock-002".into(),
            name: "Mock Wind".into(),
            coordinate: Coordinate {
                latitude: 57.47,
                longitude: 18.49,
            },
            capacity_mw: 30.0,
            technology: Technology::Wind,
            status: SiteStatus::Maintenance,
        },
    ]
}

pub fn breakdown(at: DateTime<Utc>) -> PowerBreakdown {
    PowerBreakdown::new(
        "SE-SE3",
        at,
        [
            (EnergySource::Hydro, 6_000.0),
            (EnergySource::Nuclear, 5_000.0),
            (EnergySource::Wind, 1_500.0),
            (EnergySource::Gas, 100.0),
        ],
    )
}
