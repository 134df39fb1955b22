//! Authoritative bidding-zone and production-type tables.
//!
//! Every connector that needs a zone resolves it through [`BiddingZone`], so
//! the market and carbon feeds always agree on where a coordinate lies.

use core::fmt;
use core::str::FromStr;

use gridfeed_core::{Coordinate, GridfeedError, Technology};

/// A bidding zone known to the market feed and the carbon feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiddingZone {
    /// Northern Sweden (Luleå).
    Se1,
    /// Central Sweden (Sundsvall).
    Se2,
    /// Southern-central Sweden (Stockholm).
    Se3,
    /// Southern Sweden (Malmö).
    Se4,
    /// South-eastern Norway (Oslo).
    No1,
    /// Western Denmark.
    Dk1,
    /// Eastern Denmark.
    Dk2,
    /// Finland.
    Fi,
    /// Germany and Luxembourg.
    DeLu,
    /// Netherlands.
    Nl,
    /// France.
    Fr,
}

// (zone, EIC code, carbon-feed zone, label)
const TABLE: [(BiddingZone, &str, &str, &str); 11] = [
    (BiddingZone::Se1, "10Y1001A1001A44P", "SE-SE1", "SE1"),
    (BiddingZone::Se2, "10Y1001A1001A45N", "SE-SE2", "SE2"),
    (BiddingZone::Se3, "10Y1001A1001A46L", "SE-SE3", "SE3"),
    (BiddingZone::Se4, "10Y1001A1001A47J", "SE-SE4", "SE4"),
    (BiddingZone::No1, "10YNO-1--------2", "NO-NO1", "NO1"),
    (BiddingZone::Dk1, "10YDK-1--------W", "DK-DK1", "DK1"),
    (BiddingZone::Dk2, "10YDK-2--------M", "DK-DK2", "DK2"),
    (BiddingZone::Fi, "10YFI-1--------U", "FI", "FI"),
    (BiddingZone::DeLu, "10Y1001A1001A82H", "DE", "DE-LU"),
    (BiddingZone::Nl, "10YNL----------L", "NL", "NL"),
    (BiddingZone::Fr, "10YFR-RTE------C", "FR", "FR"),
];

// Rough bounding box of Sweden; inside it the zone follows latitude bands.
const SWEDEN_LAT: (f64, f64) = (55.0, 69.1);
const SWEDEN_LON: (f64, f64) = (10.9, 24.2);

impl BiddingZone {
    /// The zone used when nothing more specific is known.
    pub const DEFAULT: Self = Self::Se3;

    fn row(self) -> (Self, &'static str, &'static str, &'static str) {
        TABLE
            .into_iter()
            .find(|(z, ..)| *z == self)
            .unwrap_or(TABLE[2])
    }

    /// Energy Identification Code used as `in_Domain`/`out_Domain`.
    #[must_use]
    pub fn eic(self) -> &'static str {
        self.row().1
    }

    /// Zone code understood by the carbon feed.
    #[must_use]
    pub fn carbon_zone(self) -> &'static str {
        self.row().2
    }

    /// Short label such as `SE3`.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.row().3
    }

    /// Swedish zone by latitude band, or `None` outside Sweden.
    #[must_use]
    pub fn for_coordinate(coordinate: &Coordinate) -> Option<Self> {
        let Coordinate {
            latitude: lat,
            longitude: lon,
        } = *coordinate;
        if !(SWEDEN_LAT.0..=SWEDEN_LAT.1).contains(&lat)
            || !(SWEDEN_LON.0..=SWEDEN_LON.1).contains(&lon)
        {
            return None;
        }
        Some(if lat < 57.0 {
            Self::Se4
        } else if lat < 61.0 {
            Self::Se3
        } else if lat < 65.0 {
            Self::Se2
        } else {
            Self::Se1
        })
    }

    /// Look a zone up by its EIC code.
    #[must_use]
    pub fn from_eic(code: &str) -> Option<Self> {
        TABLE
            .into_iter()
            .find(|(_, eic, ..)| *eic == code.trim())
            .map(|(z, ..)| z)
    }
}

impl fmt::Display for BiddingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BiddingZone {
    type Err = GridfeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_uppercase();
        TABLE
            .into_iter()
            .find(|(_, eic, carbon, label)| {
                *label == needle || *carbon == needle || *eic == needle
            })
            .map(|(z, ..)| z)
            .ok_or_else(|| GridfeedError::InvalidArg(format!("unknown bidding zone: {s}")))
    }
}

/// Production source type (`psrType`) in the market feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PsrType {
    /// B01
    Biomass,
    /// B02
    FossilBrownCoal,
    /// B03
    FossilCoalGas,
    /// B04
    FossilGas,
    /// B05
    FossilHardCoal,
    /// B06
    FossilOil,
    /// B07
    FossilOilShale,
    /// B08
    FossilPeat,
    /// B09
    Geothermal,
    /// B10
    HydroPumpedStorage,
    /// B11
    HydroRunOfRiver,
    /// B12
    HydroReservoir,
    /// B13
    Marine,
    /// B14
    Nuclear,
    /// B15
    OtherRenewable,
    /// B16
    Solar,
    /// B17
    Waste,
    /// B18
    WindOffshore,
    /// B19
    WindOnshore,
    /// B20
    Other,
}

const PSR_CODES: [(PsrType, &str); 20] = [
    (PsrType::Biomass, "B01"),
    (PsrType::FossilBrownCoal, "B02"),
    (PsrType::FossilCoalGas, "B03"),
    (PsrType::FossilGas, "B04"),
    (PsrType::FossilHardCoal, "B05"),
    (PsrType::FossilOil, "B06"),
    (PsrType::FossilOilShale, "B07"),
    (PsrType::FossilPeat, "B08"),
    (PsrType::Geothermal, "B09"),
    (PsrType::HydroPumpedStorage, "B10"),
    (PsrType::HydroRunOfRiver, "B11"),
    (PsrType::HydroReservoir, "B12"),
    (PsrType::Marine, "B13"),
    (PsrType::Nuclear, "B14"),
    (PsrType::OtherRenewable, "B15"),
    (PsrType::Solar, "B16"),
    (PsrType::Waste, "B17"),
    (PsrType::WindOffshore, "B18"),
    (PsrType::WindOnshore, "B19"),
    (PsrType::Other, "B20"),
];

impl PsrType {
    /// The `Bnn` code.
    #[must_use]
    pub fn code(self) -> &'static str {
        PSR_CODES
            .into_iter()
            .find(|(p, _)| *p == self)
            .map_or("B20", |(_, c)| c)
    }

    /// Parse a `Bnn` code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        PSR_CODES
            .into_iter()
            .find(|(_, c)| *c == code.trim())
            .map(|(p, _)| p)
    }

    /// Renewable generation; pumped storage is excluded.
    #[must_use]
    pub const fn is_renewable(self) -> bool {
        matches!(
            self,
            Self::Biomass
                | Self::Geothermal
                | Self::HydroRunOfRiver
                | Self::HydroReservoir
                | Self::Marine
                | Self::OtherRenewable
                | Self::Solar
                | Self::WindOffshore
                | Self::WindOnshore
        )
    }

    /// Fossil-fuelled generation.
    #[must_use]
    pub const fn is_fossil(self) -> bool {
        matches!(
            self,
            Self::FossilBrownCoal
                | Self::FossilCoalGas
                | Self::FossilGas
                | Self::FossilHardCoal
                | Self::FossilOil
                | Self::FossilOilShale
                | Self::FossilPeat
        )
    }

    /// The production type that matches a site technology.
    ///
    /// `Hybrid` has no single type; its generation is the sum over all types.
    #[must_use]
    pub const fn for_technology(tech: Technology) -> Option<Self> {
        match tech {
            Technology::Solar => Some(Self::Solar),
            Technology::Wind => Some(Self::WindOnshore),
            Technology::WindOffshore => Some(Self::WindOffshore),
            Technology::Hydro => Some(Self::HydroReservoir),
            Technology::Hybrid => None,
        }
    }
}

impl fmt::Display for PsrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
