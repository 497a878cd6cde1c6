//! Technology scenarios and their cost/CO2 evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::building::BuildingInput;
use crate::config::{ConfigError, MarketConfig, RuleParams};

use super::consumption::{ConsumptionBlocks, building_heating_kwh, consumption_blocks};
use super::energy_balance::{BalanceInput, EnergyBalance, estimate_energy_balance};
use super::sizing::{SizingRecommendation, recommend_battery_kwh, recommend_pv_kwp};
use super::validation::{ScenarioCheck, ValidationOutcome, validate};

/// Closed set of modernization packages evaluated per building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    PvOnly,
    PvBattery,
    PvBatteryHeatPump,
}

impl Scenario {
    /// Scenarios in evaluation order.
    pub const ALL: [Self; 3] = [Self::PvOnly, Self::PvBattery, Self::PvBatteryHeatPump];

    /// Stable snake-case identifier.
    pub fn code(self) -> &'static str {
        match self {
            Self::PvOnly => "pv_only",
            Self::PvBattery => "pv_battery",
            Self::PvBatteryHeatPump => "pv_battery_heat_pump",
        }
    }

    /// Human-readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::PvOnly => "PV only",
            Self::PvBattery => "PV + battery",
            Self::PvBatteryHeatPump => "PV + battery + heat pump",
        }
    }

    /// Whether the package includes battery storage.
    pub fn has_storage(self) -> bool {
        match self {
            Self::PvOnly => false,
            Self::PvBattery | Self::PvBatteryHeatPump => true,
        }
    }

    /// Whether the package replaces gas heating with a heat pump.
    pub fn has_heat_pump(self) -> bool {
        match self {
            Self::PvOnly | Self::PvBattery => false,
            Self::PvBatteryHeatPump => true,
        }
    }

    /// Plausible autarky band for this package (%).
    pub fn autarky_band_pct(self, rules: &RuleParams) -> (f64, f64) {
        match self {
            Self::PvOnly => rules.pv_only_autarky_pct,
            Self::PvBattery => rules.pv_battery_autarky_pct,
            Self::PvBatteryHeatPump => rules.full_autarky_pct,
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sc| sc.code() == s)
            .ok_or_else(|| format!("unknown scenario \"{s}\" (pv_only, pv_battery, pv_battery_heat_pump)"))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pre-modernization reference of a building.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    /// Annual energy cost today, including combustion-vehicle fuel (EUR).
    pub cost_eur: f64,
    /// Annual emissions today, including the combustion vehicle (kg).
    pub co2_kg: f64,
}

/// Cost and emission figures of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Economics {
    pub baseline_cost_eur: f64,
    /// Annual energy cost after modernization (EUR).
    pub post_cost_eur: f64,
    /// Investment for PV, battery, and heat pump (EUR).
    pub total_cost_eur: f64,
    pub savings_eur: f64,
    /// Years until savings repay the investment; `None` without savings.
    pub break_even_years: Option<f64>,
    pub co2_today_kg: f64,
    pub co2_after_kg: f64,
    pub co2_saving_kg: f64,
}

/// Complete outcome of one building in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub blocks: ConsumptionBlocks,
    /// Building heating demand before heat-pump gating (kWh/a).
    pub building_heating_kwh: f64,
    pub sizing: SizingRecommendation,
    pub balance: EnergyBalance,
    pub economics: Economics,
    pub validation: ValidationOutcome,
}

/// Annual cost and CO2 of the building before modernization.
pub fn baseline(market: &MarketConfig, input: &BuildingInput, household_kwh: f64, heating_kwh: f64) -> Baseline {
    let vehicle = &market.model.vehicle;
    let mut cost_eur = household_kwh * market.prices.electricity_eur_per_kwh
        + heating_kwh * market.prices.gas_eur_per_kwh;
    let mut co2_kg =
        household_kwh * market.co2.electricity_factor + heating_kwh * market.co2.gas_factor;
    if input.has_wallbox {
        cost_eur += vehicle.combustion_fuel_cost_eur;
        co2_kg += vehicle.combustion_co2_kg;
    }
    Baseline { cost_eur, co2_kg }
}

/// Sizes, simulates, prices, and validates `input` under `scenario`.
///
/// # Errors
///
/// Returns `ConfigError::MissingKey` if the heating table lacks the
/// building's class or insulation level.
pub fn evaluate_scenario(
    market: &MarketConfig,
    input: &BuildingInput,
    scenario: Scenario,
) -> Result<ScenarioResult, ConfigError> {
    let blocks = consumption_blocks(market, input, scenario)?;
    let heating_kwh = building_heating_kwh(market, input)?;
    let base = baseline(market, input, blocks.household, heating_kwh);
    Ok(evaluate_with_blocks(market, input, scenario, blocks, heating_kwh, base))
}

/// Evaluates all scenarios of one building in fixed order.
///
/// # Errors
///
/// Returns `ConfigError::MissingKey` if the heating table lacks the
/// building's class or insulation level.
pub fn evaluate_building(
    market: &MarketConfig,
    input: &BuildingInput,
) -> Result<Vec<ScenarioResult>, ConfigError> {
    let heating_kwh = building_heating_kwh(market, input)?;
    let household_kwh = f64::from(input.occupants) * market.consumption.per_person;
    let base = baseline(market, input, household_kwh, heating_kwh);

    Scenario::ALL
        .into_iter()
        .map(|scenario| {
            let blocks = consumption_blocks(market, input, scenario)?;
            Ok(evaluate_with_blocks(market, input, scenario, blocks, heating_kwh, base))
        })
        .collect()
}

fn evaluate_with_blocks(
    market: &MarketConfig,
    input: &BuildingInput,
    scenario: Scenario,
    blocks: ConsumptionBlocks,
    building_heating_kwh: f64,
    base: Baseline,
) -> ScenarioResult {
    let model = &market.model;
    let yield_per_kwp = market.pv.yield_per_kwp;
    let annual_demand = blocks.annual_electric_kwh();

    let pv_kwp = recommend_pv_kwp(annual_demand, input.roof_area_sqm, input.house_type, &model.sizing);
    let battery_kwh = if scenario.has_storage() {
        recommend_battery_kwh(annual_demand, pv_kwp, yield_per_kwp, &model.sizing)
    } else {
        0.0
    };
    let sizing = SizingRecommendation { pv_kwp, battery_kwh };

    let balance = estimate_energy_balance(
        &BalanceInput {
            pv_kwp,
            battery_kwh,
            annual_demand_kwh: annual_demand,
            yield_per_kwp,
            has_ev: input.has_wallbox,
            ev_demand_kwh: blocks.ev,
        },
        &model.balance,
    );

    let economics = economics(market, input, scenario, &blocks, &sizing, &balance, base);

    let validation = validate(
        &ScenarioCheck {
            input,
            scenario,
            blocks: &blocks,
            sizing: &sizing,
            balance: &balance,
            economics: &economics,
        },
        market,
    );

    ScenarioResult {
        scenario,
        blocks,
        building_heating_kwh,
        sizing,
        balance,
        economics,
        validation,
    }
}

fn economics(
    market: &MarketConfig,
    input: &BuildingInput,
    scenario: Scenario,
    blocks: &ConsumptionBlocks,
    sizing: &SizingRecommendation,
    balance: &EnergyBalance,
    base: Baseline,
) -> Economics {
    let prices = &market.prices;
    let co2 = &market.co2;

    let pv_cost = sizing.pv_kwp * market.pv.cost_per_kwp;
    let battery_cost = sizing.battery_kwh * market.battery.cost_per_kwh;
    let heat_pump_cost = if scenario.has_heat_pump() {
        let rated_kw = market.model.demand.heatpump_kwh / market.heatpump.full_load_hours;
        rated_kw * market.heatpump.cost_per_kw
    } else {
        0.0
    };
    let total_cost = pv_cost + battery_cost + heat_pump_cost;

    let post_cost = balance.grid_import_kwh * prices.electricity_eur_per_kwh
        - balance.feed_in_kwh * prices.feed_in_eur_per_kwh
        + blocks.heating * prices.gas_eur_per_kwh;
    let savings = base.cost_eur - post_cost;
    let break_even_years = (savings > 0.0).then(|| total_cost / savings);

    // Grid energy attributable to EV charging is priced at the grid mix.
    let ev_grid = if input.has_wallbox {
        blocks.ev.min(balance.grid_import_kwh)
    } else {
        0.0
    };
    let other_grid = balance.grid_import_kwh - ev_grid;
    let co2_after = other_grid * co2.electricity_factor
        + ev_grid * market.model.vehicle.ev_grid_co2_factor
        + blocks.heating * co2.gas_factor;

    Economics {
        baseline_cost_eur: base.cost_eur,
        post_cost_eur: post_cost,
        total_cost_eur: total_cost,
        savings_eur: savings,
        break_even_years,
        co2_today_kg: base.co2_kg,
        co2_after_kg: co2_after,
        co2_saving_kg: base.co2_kg - co2_after,
    }
}
