//! Decomposition of annual demand into independent blocks.

use serde::Serialize;

use crate::building::BuildingInput;
use crate::config::{ConfigError, MarketConfig};

use super::scenario::Scenario;

/// Annual demand components for one building in one scenario (kWh/a).
///
/// `heating` is the gas heating demand still served by the existing boiler
/// and is zero once a heat pump takes over; `heatpump` is the electricity
/// the heat pump draws instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionBlocks {
    pub household: f64,
    pub heating: f64,
    pub climate: f64,
    pub ev: f64,
    pub heatpump: f64,
}

impl ConsumptionBlocks {
    /// Electricity demand the PV system is sized against.
    pub fn annual_electric_kwh(&self) -> f64 {
        self.household + self.climate + self.ev + self.heatpump
    }
}

/// Heating demand of the building before any heat-pump gating (kWh/a).
///
/// # Errors
///
/// Returns `ConfigError::MissingKey` if the heating table lacks the
/// building's class or insulation level.
pub fn building_heating_kwh(
    market: &MarketConfig,
    input: &BuildingInput,
) -> Result<f64, ConfigError> {
    Ok(input.floor_area_sqm * market.heating_per_sqm(input)?)
}

/// Derives the demand blocks of `input` for `scenario`.
///
/// # Errors
///
/// Returns `ConfigError::MissingKey` if the heating table lacks the
/// building's class or insulation level.
pub fn consumption_blocks(
    market: &MarketConfig,
    input: &BuildingInput,
    scenario: Scenario,
) -> Result<ConsumptionBlocks, ConfigError> {
    let demand = &market.model.demand;
    let heating = building_heating_kwh(market, input)?;
    let with_heat_pump = scenario.has_heat_pump();

    Ok(ConsumptionBlocks {
        household: f64::from(input.occupants) * market.consumption.per_person,
        heating: if with_heat_pump { 0.0 } else { heating },
        climate: if input.has_climate_control {
            demand.climate_kwh
        } else {
            0.0
        },
        ev: if input.has_wallbox { demand.ev_kwh } else { 0.0 },
        heatpump: if with_heat_pump {
            demand.heatpump_kwh
        } else {
            0.0
        },
    })
}
