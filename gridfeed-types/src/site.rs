use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GridfeedError;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, within `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Central Stockholm; the default location for queries without a site.
    pub const STOCKHOLM: Self = Self {
        latitude: 59.3293,
        longitude: 18.0686,
    };

    /// Build a validated coordinate.
    ///
    /// # Errors
    /// Returns `InvalidArg` when either component is non-finite or out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GridfeedError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GridfeedError::InvalidArg(format!(
                "latitude out of range: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GridfeedError::InvalidArg(format!(
                "longitude out of range: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Coordinate components scaled to integers at `precision` decimal places.
    ///
    /// Two coordinates that agree on this key are treated as the same location
    /// for caching purposes.
    #[must_use]
    pub fn rounded_key(&self, precision: u8) -> (i64, i64) {
        let scale = 10f64.powi(i32::from(precision));
        // Values are range-checked, so the scaled product always fits in i64.
        #[allow(clippy::cast_possible_truncation)]
        let round = |v: f64| (v * scale).round() as i64;
        (round(self.latitude), round(self.longitude))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Generation technology of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// Photovoltaic.
    Solar,
    /// Onshore wind.
    Wind,
    /// Offshore wind.
    WindOffshore,
    /// Hydroelectric.
    Hydro,
    /// More than one technology behind a single connection point.
    Hybrid,
}

impl Technology {
    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Wind => "wind",
            Self::WindOffshore => "wind_offshore",
            Self::Hydro => "hydro",
            Self::Hybrid => "hybrid",
        }
    }

    /// Whether output of this technology depends on wind.
    #[must_use]
    pub const fn is_wind(self) -> bool {
        matches!(self, Self::Wind | Self::WindOffshore)
    }
}

impl FromStr for Technology {
    type Err = GridfeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "solar" | "pv" | "photovoltaic" => Ok(Self::Solar),
            "wind" | "wind_onshore" | "onshore_wind" => Ok(Self::Wind),
            "wind_offshore" | "offshore_wind" | "offshore" => Ok(Self::WindOffshore),
            "hydro" | "hydroelectric" | "hydropower" => Ok(Self::Hydro),
            "hybrid" | "mixed" => Ok(Self::Hybrid),
            other => Err(GridfeedError::InvalidArg(format!(
                "unknown technology: {other}"
            ))),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    /// Producing normally.
    #[default]
    Active,
    /// Planned downtime.
    Maintenance,
    /// Not producing.
    Offline,
}

impl FromStr for SiteStatus {
    type Err = GridfeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "online" | "operational" => Ok(Self::Active),
            "maintenance" => Ok(Self::Maintenance),
            "offline" | "inactive" => Ok(Self::Offline),
            other => Err(GridfeedError::InvalidArg(format!("unknown site status: {other}"))),
        }
    }
}

/// A generation site. Immutable once loaded into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Provider-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Site location.
    pub coordinate: Coordinate,
    /// Rated capacity in MW.
    pub capacity_mw: f64,
    /// Generation technology.
    pub technology: Technology,
    /// Operational status.
    pub status: SiteStatus,
}

impl Site {
    /// A placeholder site for queries addressed by coordinate only.
    ///
    /// It carries no rated capacity, so synthesized generation falls back to
    /// grid-scale defaults.
    #[must_use]
    pub fn ad_hoc(coordinate: Coordinate) -> Self {
        Self {
            id: format!("coord:{coordinate}"),
            name: "Custom location".to_string(),
            coordinate,
            capacity_mw: 0.0,
            technology: Technology::Hybrid,
            status: SiteStatus::Active,
        }
    }

    /// Rated capacity, or `None` when the site has none declared.
    #[must_use]
    pub fn capacity(&self) -> Option<f64> {
        (self.capacity_mw > 0.0).then_some(self.capacity_mw)
    }
}
