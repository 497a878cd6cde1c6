//! TOML-based market configuration and model parameters.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::building::{BuildingInput, HouseType};

/// Configuration error with the offending field or key path.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("cannot access \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The TOML document is malformed, misses a required field, or has unknown fields.
    #[error("invalid market configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered back to TOML.
    #[error("cannot serialize market configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A lookup key required by an input is absent.
    #[error("missing configuration key: {key}")]
    MissingKey { key: String },
    /// A field is present but violates a constraint.
    #[error("config error: {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: &str) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Market, tariff, cost, and CO2 parameters for one run.
///
/// All market sections are required. The optional `[model]` section holds the
/// sizing heuristics and rule thresholds; every field there has a default.
/// Load from TOML with [`MarketConfig::from_toml_file`] or use
/// [`MarketConfig::baseline`] for the built-in reference values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketConfig {
    pub consumption: ConsumptionConfig,
    pub prices: PriceConfig,
    pub pv: PvConfig,
    pub battery: BatteryConfig,
    pub heatpump: HeatPumpConfig,
    pub co2: Co2Config,
    /// Heuristic constants and validation thresholds.
    #[serde(default)]
    pub model: ModelParams,
}

/// Demand baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumptionConfig {
    /// Household electricity per occupant (kWh/a).
    pub per_person: f64,
    /// Heating demand per m² (kWh/m²·a), keyed by house class then insulation level.
    pub heating_per_sqm: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Energy prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceConfig {
    pub electricity_eur_per_kwh: f64,
    pub gas_eur_per_kwh: f64,
    pub feed_in_eur_per_kwh: f64,
}

/// Photovoltaic yield and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PvConfig {
    /// Specific annual yield (kWh per kWp).
    pub yield_per_kwp: f64,
    pub cost_per_kwp: f64,
}

/// Battery storage cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryConfig {
    pub cost_per_kwh: f64,
}

/// Heat pump sizing and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatPumpConfig {
    /// Annual full-load hours used to derive the rated power.
    pub full_load_hours: f64,
    pub cost_per_kw: f64,
}

/// Emission factors (kg CO2 per kWh).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Co2Config {
    pub electricity_factor: f64,
    pub gas_factor: f64,
}

/// Heuristic model constants, grouped by the component that uses them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelParams {
    pub demand: DemandParams,
    pub sizing: SizingParams,
    pub balance: BalanceParams,
    pub vehicle: VehicleParams,
    pub rules: RuleParams,
}

/// Fixed demand blocks (kWh/a).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandParams {
    /// Air conditioning, added when the building has climate control.
    pub climate_kwh: f64,
    /// Electric vehicle charging, added when the building has a wallbox.
    pub ev_kwh: f64,
    /// Heat pump electricity, replaces gas heating in the heat-pump scenario.
    pub heatpump_kwh: f64,
}

impl Default for DemandParams {
    fn default() -> Self {
        Self {
            climate_kwh: 450.0,
            ev_kwh: 2550.0,
            heatpump_kwh: 5500.0,
        }
    }
}

/// PV and battery sizing heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingParams {
    /// Smallest PV system proposed (kWp).
    pub min_pv_kwp: f64,
    /// Annual demand covered per proposed kWp (kWh/kWp).
    pub demand_kwh_per_kwp: f64,
    /// Roof area needed per kWp (m²).
    pub roof_sqm_per_kwp: f64,
    pub rowhouse_cap_kwp: f64,
    pub semi_detached_cap_kwp: f64,
    pub detached_cap_kwp: f64,
    /// Battery target as a share of average daily demand.
    pub battery_daily_share: f64,
    pub battery_min_kwh: f64,
    pub battery_max_kwh: f64,
    /// Battery ceiling in days of average PV yield.
    pub battery_max_pv_days: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            min_pv_kwp: 6.0,
            demand_kwh_per_kwp: 900.0,
            roof_sqm_per_kwp: 7.0,
            rowhouse_cap_kwp: 12.0,
            semi_detached_cap_kwp: 15.0,
            detached_cap_kwp: 20.0,
            battery_daily_share: 0.8,
            battery_min_kwh: 5.0,
            battery_max_kwh: 12.0,
            battery_max_pv_days: 2.0,
        }
    }
}

impl SizingParams {
    /// PV cap for the given house type (kWp).
    pub fn house_type_cap_kwp(&self, house_type: HouseType) -> f64 {
        match house_type {
            HouseType::Rowhouse => self.rowhouse_cap_kwp,
            HouseType::SemiDetached => self.semi_detached_cap_kwp,
            HouseType::Detached => self.detached_cap_kwp,
        }
    }
}

/// Annual energy-flow heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalanceParams {
    /// Share of demand met directly by PV when a battery is present.
    pub direct_share_with_battery: f64,
    pub direct_share_without_battery: f64,
    /// Direct self-use never exceeds this share of PV generation.
    pub direct_max_pv_share: f64,
    /// Usable share of battery capacity cycled per day.
    pub battery_daily_cycle_share: f64,
    pub battery_round_trip: f64,
    pub max_autarky_with_battery: f64,
    pub max_autarky_without_battery: f64,
    /// Regulatory minimum share of generation fed into the grid.
    pub min_feed_in_share: f64,
    /// Share of EV demand that could be served from storage.
    pub ev_battery_demand_share: f64,
    /// Share of battery output available for EV charging.
    pub ev_battery_output_share: f64,
}

impl Default for BalanceParams {
    fn default() -> Self {
        Self {
            direct_share_with_battery: 0.32,
            direct_share_without_battery: 0.27,
            direct_max_pv_share: 0.9,
            battery_daily_cycle_share: 0.7,
            battery_round_trip: 0.83,
            max_autarky_with_battery: 0.75,
            max_autarky_without_battery: 0.4,
            min_feed_in_share: 0.30,
            ev_battery_demand_share: 0.7,
            ev_battery_output_share: 0.4,
        }
    }
}

/// Combustion-vehicle reference replaced by an EV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleParams {
    /// Annual CO2 of the replaced combustion vehicle (kg).
    pub combustion_co2_kg: f64,
    /// Annual fuel cost of the replaced combustion vehicle (EUR).
    pub combustion_fuel_cost_eur: f64,
    /// Annual CO2 of the EV charged from the average grid (kg).
    pub ev_co2_kg: f64,
    /// Grid-mix emission factor applied to EV charging energy (kg/kWh).
    pub ev_grid_co2_factor: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            combustion_co2_kg: 2415.0,
            combustion_fuel_cost_eur: 1940.0,
            ev_co2_kg: 893.0,
            ev_grid_co2_factor: 0.35,
        }
    }
}

impl VehicleParams {
    /// Expected annual CO2 saving from switching to the EV (kg).
    pub fn expected_ev_saving_kg(&self) -> f64 {
        self.combustion_co2_kg - self.ev_co2_kg
    }
}

/// Plausibility thresholds checked by the rule validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleParams {
    /// Grid draw below this is implausibly low (kWh/a).
    pub min_grid_import_kwh: f64,
    /// Tolerated shortfall against the expected EV CO2 saving (kg).
    pub ev_co2_saving_slack_kg: f64,
    pub pv_only_autarky_pct: (f64, f64),
    pub pv_battery_autarky_pct: (f64, f64),
    pub full_autarky_pct: (f64, f64),
    /// Physical autarky bounds; outside is an error (%).
    pub autarky_limits_pct: (f64, f64),
    pub max_break_even_years: f64,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            min_grid_import_kwh: 200.0,
            ev_co2_saving_slack_kg: 400.0,
            pv_only_autarky_pct: (12.0, 50.0),
            pv_battery_autarky_pct: (35.0, 85.0),
            full_autarky_pct: (45.0, 90.0),
            autarky_limits_pct: (3.0, 95.0),
            max_break_even_years: 40.0,
        }
    }
}

impl MarketConfig {
    /// Returns the built-in reference configuration.
    pub fn baseline() -> Self {
        let heating_row = |poor: f64, normal: f64, good: f64| {
            BTreeMap::from([
                ("poor".to_string(), poor),
                ("normal".to_string(), normal),
                ("good".to_string(), good),
            ])
        };
        Self {
            consumption: ConsumptionConfig {
                per_person: 1000.0,
                heating_per_sqm: BTreeMap::from([
                    ("rowhouse".to_string(), heating_row(150.0, 100.0, 60.0)),
                    ("semi_detached".to_string(), heating_row(165.0, 110.0, 65.0)),
                    ("freestanding".to_string(), heating_row(180.0, 120.0, 70.0)),
                ]),
            },
            prices: PriceConfig {
                electricity_eur_per_kwh: 0.35,
                gas_eur_per_kwh: 0.11,
                feed_in_eur_per_kwh: 0.08,
            },
            pv: PvConfig {
                yield_per_kwp: 950.0,
                cost_per_kwp: 1400.0,
            },
            battery: BatteryConfig {
                cost_per_kwh: 700.0,
            },
            heatpump: HeatPumpConfig {
                full_load_hours: 2000.0,
                cost_per_kw: 4000.0,
            },
            co2: Co2Config {
                electricity_factor: 0.38,
                gas_factor: 0.2,
            },
            model: ModelParams::default(),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid, misses a required
    /// field, or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to a TOML file.
    pub fn save_toml_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Heating demand per m² for the input's house class and insulation level.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` when the table has no entry for the
    /// class or level.
    pub fn heating_per_sqm(&self, input: &BuildingInput) -> Result<f64, ConfigError> {
        let class = input.house_type.heating_class();
        let level = input.insulation.as_str();
        self.consumption
            .heating_per_sqm
            .get(class)
            .and_then(|row| row.get(level))
            .copied()
            .ok_or_else(|| ConfigError::MissingKey {
                key: format!("consumption.heating_per_sqm.{class}.{level}"),
            })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Missing heating
    /// table entries are not reported here; they surface per input.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let non_negative = [
            ("consumption.per_person", self.consumption.per_person),
            (
                "prices.electricity_eur_per_kwh",
                self.prices.electricity_eur_per_kwh,
            ),
            ("prices.gas_eur_per_kwh", self.prices.gas_eur_per_kwh),
            ("prices.feed_in_eur_per_kwh", self.prices.feed_in_eur_per_kwh),
            ("pv.cost_per_kwp", self.pv.cost_per_kwp),
            ("battery.cost_per_kwh", self.battery.cost_per_kwh),
            ("heatpump.cost_per_kw", self.heatpump.cost_per_kw),
            ("co2.electricity_factor", self.co2.electricity_factor),
            ("co2.gas_factor", self.co2.gas_factor),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::invalid(field, "must be a finite value >= 0"));
            }
        }

        for (class, row) in &self.consumption.heating_per_sqm {
            for (level, value) in row {
                if !value.is_finite() || *value < 0.0 {
                    errors.push(ConfigError::Invalid {
                        field: format!("consumption.heating_per_sqm.{class}.{level}"),
                        message: "must be a finite value >= 0".into(),
                    });
                }
            }
        }

        if !(self.pv.yield_per_kwp > 0.0) {
            errors.push(ConfigError::invalid("pv.yield_per_kwp", "must be > 0"));
        }
        if !(self.heatpump.full_load_hours > 0.0) {
            errors.push(ConfigError::invalid("heatpump.full_load_hours", "must be > 0"));
        }

        let sizing = &self.model.sizing;
        if !(sizing.demand_kwh_per_kwp > 0.0) {
            errors.push(ConfigError::invalid(
                "model.sizing.demand_kwh_per_kwp",
                "must be > 0",
            ));
        }
        if !(sizing.roof_sqm_per_kwp > 0.0) {
            errors.push(ConfigError::invalid(
                "model.sizing.roof_sqm_per_kwp",
                "must be > 0",
            ));
        }
        if sizing.battery_min_kwh > sizing.battery_max_kwh {
            errors.push(ConfigError::invalid(
                "model.sizing.battery_min_kwh",
                "must be <= model.sizing.battery_max_kwh",
            ));
        }

        let balance = &self.model.balance;
        let shares = [
            (
                "model.balance.direct_share_with_battery",
                balance.direct_share_with_battery,
            ),
            (
                "model.balance.direct_share_without_battery",
                balance.direct_share_without_battery,
            ),
            (
                "model.balance.direct_max_pv_share",
                balance.direct_max_pv_share,
            ),
            (
                "model.balance.battery_round_trip",
                balance.battery_round_trip,
            ),
            (
                "model.balance.max_autarky_with_battery",
                balance.max_autarky_with_battery,
            ),
            (
                "model.balance.max_autarky_without_battery",
                balance.max_autarky_without_battery,
            ),
            ("model.balance.min_feed_in_share", balance.min_feed_in_share),
        ];
        for (field, value) in shares {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::invalid(field, "must be in [0.0, 1.0]"));
            }
        }

        errors
    }
}
