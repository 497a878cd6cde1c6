//! Building attributes evaluated by the matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Construction type of the house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseType {
    Rowhouse,
    SemiDetached,
    Detached,
}

impl HouseType {
    /// All house types in matrix order.
    pub const ALL: [Self; 3] = [Self::Rowhouse, Self::SemiDetached, Self::Detached];

    /// Stable identifier used in records and CSV output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rowhouse => "rowhouse",
            Self::SemiDetached => "semi_detached",
            Self::Detached => "detached",
        }
    }

    /// Key into `consumption.heating_per_sqm`.
    ///
    /// Detached houses are looked up under the generic `freestanding` class.
    pub fn heating_class(self) -> &'static str {
        match self {
            Self::Rowhouse => "rowhouse",
            Self::SemiDetached => "semi_detached",
            Self::Detached => "freestanding",
        }
    }
}

impl FromStr for HouseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| format!("unknown house type \"{s}\" (rowhouse, semi_detached, detached)"))
    }
}

impl fmt::Display for HouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thermal insulation quality of the building envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insulation {
    Poor,
    Normal,
    Good,
}

impl Insulation {
    /// All insulation levels in matrix order.
    pub const ALL: [Self; 3] = [Self::Poor, Self::Normal, Self::Good];

    /// Stable identifier, also the key into the heating table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Normal => "normal",
            Self::Good => "good",
        }
    }
}

impl fmt::Display for Insulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One building configuration to size and evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingInput {
    pub house_type: HouseType,
    /// Heated living area (m²).
    pub floor_area_sqm: f64,
    pub occupants: u32,
    pub has_floor_heating: bool,
    pub insulation: Insulation,
    /// Roof area usable for PV modules (m²).
    pub roof_area_sqm: f64,
    pub has_climate_control: bool,
    pub has_wallbox: bool,
}

impl fmt::Display for BuildingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} m², {} occupants, {} insulation, roof {} m², floor heating={}, climate={}, wallbox={}",
            self.house_type,
            self.floor_area_sqm,
            self.occupants,
            self.insulation,
            self.roof_area_sqm,
            self.has_floor_heating,
            self.has_climate_control,
            self.has_wallbox
        )
    }
}
