//! Plausibility rules applied to every evaluated scenario.
//!
//! Every rule runs on every scenario; findings accumulate in check order and
//! never stop evaluation. Issues mark results that contradict the model's
//! own constraints, warnings mark results that are possible but unusual.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::building::BuildingInput;
use crate::config::MarketConfig;

use super::consumption::ConsumptionBlocks;
use super::energy_balance::EnergyBalance;
use super::scenario::{Economics, Scenario};
use super::sizing::{SizingRecommendation, daily_pv_yield_kwh, roof_limit_kwp};

const EPS: f64 = 1e-6;

/// Identifier of a plausibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    RoofLimit,
    BatteryOversized,
    GridImportTooLow,
    ClimateBlock,
    EvBlock,
    HeatPumpBlock,
    Co2Regression,
    Co2SavingLow,
    AutarkyBand,
    AutarkyImplausible,
    BreakEvenUndefined,
    BreakEvenTooLong,
}

impl RuleId {
    /// Stable snake-case code.
    pub fn code(self) -> &'static str {
        match self {
            Self::RoofLimit => "roof_limit",
            Self::BatteryOversized => "battery_oversized",
            Self::GridImportTooLow => "grid_import_too_low",
            Self::ClimateBlock => "climate_block",
            Self::EvBlock => "ev_block",
            Self::HeatPumpBlock => "heat_pump_block",
            Self::Co2Regression => "co2_regression",
            Self::Co2SavingLow => "co2_saving_low",
            Self::AutarkyBand => "autarky_band",
            Self::AutarkyImplausible => "autarky_implausible",
            Self::BreakEvenUndefined => "break_even_undefined",
            Self::BreakEvenTooLong => "break_even_too_long",
        }
    }

    /// Suggested follow-up when the rule fires across a run.
    pub fn remediation(self) -> &'static str {
        match self {
            Self::RoofLimit => "PV sizing exceeds the roof area; check the roof limit in sizing",
            Self::BatteryOversized => "Battery exceeds two days of PV yield; check the storage ceiling",
            Self::GridImportTooLow => {
                "Storage logic yields too little grid import; check charge and discharge losses"
            }
            Self::ClimateBlock | Self::EvBlock | Self::HeatPumpBlock => {
                "Consumption blocks are mixed up; check the demand decomposition"
            }
            Self::Co2Regression | Self::Co2SavingLow => {
                "CO2 result with wallbox shows little or no saving; check the combustion-vehicle replacement"
            }
            Self::AutarkyBand | Self::AutarkyImplausible => {
                "Autarky outside the expected corridor; check direct-use shares and storage caps"
            }
            Self::BreakEvenUndefined | Self::BreakEvenTooLong => {
                "Break-even outside the target corridor; check feed-in tariff and EV savings"
            }
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Severity of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Hard finding; the result is an error.
    Issue,
    /// Soft finding; the result is a warning.
    Warning,
}

/// Derived status of a validated scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Warning,
    Error,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Ok, Self::Warning, Self::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown status \"{s}\" (ok, warning, error)"))
    }
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    /// Record columns implicated by the finding.
    pub fields: Vec<&'static str>,
}

/// Ordered findings for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub violations: Vec<RuleViolation>,
}

impl ValidationOutcome {
    fn push(&mut self, rule: RuleId, severity: Severity, message: String, fields: &[&'static str]) {
        self.violations.push(RuleViolation {
            rule,
            severity,
            message,
            fields: fields.to_vec(),
        });
    }

    fn issue(&mut self, rule: RuleId, message: impl Into<String>, fields: &[&'static str]) {
        self.push(rule, Severity::Issue, message.into(), fields);
    }

    fn warning(&mut self, rule: RuleId, message: impl Into<String>, fields: &[&'static str]) {
        self.push(rule, Severity::Warning, message.into(), fields);
    }

    /// Hard findings in check order.
    pub fn issues(&self) -> impl Iterator<Item = &RuleViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Issue)
    }

    /// Soft findings in check order.
    pub fn warnings(&self) -> impl Iterator<Item = &RuleViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
    }

    /// Whether a rule fired.
    pub fn has(&self, rule: RuleId) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    pub fn status(&self) -> Status {
        if self.issues().next().is_some() {
            Status::Error
        } else if self.warnings().next().is_some() {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

/// Everything the rules look at for one scenario.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioCheck<'a> {
    pub input: &'a BuildingInput,
    pub scenario: Scenario,
    pub blocks: &'a ConsumptionBlocks,
    pub sizing: &'a SizingRecommendation,
    pub balance: &'a EnergyBalance,
    pub economics: &'a Economics,
}

/// Runs every rule against one scenario.
pub fn validate(check: &ScenarioCheck<'_>, market: &MarketConfig) -> ValidationOutcome {
    let mut out = ValidationOutcome::default();
    let model = &market.model;
    let rules = &model.rules;
    let input = check.input;
    let scenario = check.scenario;

    let roof_max = roof_limit_kwp(input.roof_area_sqm, &model.sizing);
    if check.sizing.pv_kwp > roof_max + EPS {
        out.issue(
            RuleId::RoofLimit,
            format!(
                "PV sizing exceeds roof limit ({} kWp > {roof_max})",
                check.sizing.pv_kwp
            ),
            &["pv_kwp", "roof_area_sqm"],
        );
    }

    let daily_pv = daily_pv_yield_kwh(check.sizing.pv_kwp, market.pv.yield_per_kwp);
    if scenario.has_storage()
        && check.sizing.battery_kwh > daily_pv * model.sizing.battery_max_pv_days + EPS
    {
        out.issue(
            RuleId::BatteryOversized,
            "Battery larger than two days of PV yield",
            &["battery_kwh", "pv_kwp"],
        );
    }

    if check.balance.grid_import_kwh < rules.min_grid_import_kwh {
        out.warning(
            RuleId::GridImportTooLow,
            format!(
                "Grid import too low (<{} kWh/a)",
                rules.min_grid_import_kwh
            ),
            &["grid_import"],
        );
    }

    let demand = &model.demand;
    let expected_climate = if input.has_climate_control {
        demand.climate_kwh
    } else {
        0.0
    };
    let expected_ev = if input.has_wallbox { demand.ev_kwh } else { 0.0 };
    let expected_heatpump = if scenario.has_heat_pump() {
        demand.heatpump_kwh
    } else {
        0.0
    };
    if check.blocks.climate != expected_climate {
        out.issue(
            RuleId::ClimateBlock,
            "Climate consumption not cleanly separated",
            &["climate_block"],
        );
    }
    if check.blocks.ev != expected_ev {
        out.issue(
            RuleId::EvBlock,
            "EV consumption not cleanly separated",
            &["ev_block"],
        );
    }
    if check.blocks.heatpump != expected_heatpump {
        out.issue(
            RuleId::HeatPumpBlock,
            "Heat pump consumption not cleanly separated",
            &["heatpump_block"],
        );
    }

    if input.has_wallbox {
        let saving = check.economics.co2_saving_kg;
        if saving <= 0.0 {
            out.issue(
                RuleId::Co2Regression,
                "CO2 balance worsens despite EV; check core model and assumptions",
                &["co2_saving", "co2_today", "co2_after"],
            );
        } else if saving < model.vehicle.expected_ev_saving_kg() - rules.ev_co2_saving_slack_kg {
            out.warning(
                RuleId::Co2SavingLow,
                "CO2 saving from EV much lower than expected; check grid mix, PV share, or mileage",
                &["co2_saving"],
            );
        }
    }

    let autarky = check.balance.autarky_pct;
    let (low, high) = scenario.autarky_band_pct(rules);
    if !(low..=high).contains(&autarky) {
        out.warning(
            RuleId::AutarkyBand,
            format!("Autarky outside {low}-{high} % ({})", scenario.label()),
            &["autarky_pct"],
        );
    }
    let (min_pct, max_pct) = rules.autarky_limits_pct;
    if autarky > max_pct || autarky < min_pct {
        out.issue(
            RuleId::AutarkyImplausible,
            format!("Autarky outside physical limits (>{max_pct} % or <{min_pct} %)"),
            &["autarky_pct"],
        );
    }

    match check.economics.break_even_years {
        Some(years) if years > 0.0 => {
            if years > rules.max_break_even_years {
                out.warning(
                    RuleId::BreakEvenTooLong,
                    format!(
                        "Break-even very long (>{} years); economically weak",
                        rules.max_break_even_years
                    ),
                    &["break_even_years"],
                );
            }
        }
        _ => out.issue(
            RuleId::BreakEvenUndefined,
            "Break-even not computable or savings negative",
            &["break_even_years"],
        ),
    }

    out
}
