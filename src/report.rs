//! Flat output records and run-level summaries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::building::{BuildingInput, HouseType, Insulation};
use crate::sim::scenario::{Scenario, ScenarioResult};
use crate::sim::validation::{RuleId, Status};

/// Rounds to `decimals` places, ties to even.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// One row of the result table handed to the reporting sink.
///
/// Figures are rounded the way they are reported; consumption blocks stay
/// exact so the decomposition can be compared against its constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub house_type: HouseType,
    pub floor_area_sqm: f64,
    pub occupants: u32,
    pub floor_heating: bool,
    pub insulation: Insulation,
    pub roof_area_sqm: f64,
    pub climate_control: bool,
    pub wallbox: bool,
    pub scenario: Scenario,
    pub pv_kwp: f64,
    pub battery_kwh: f64,
    pub grid_import: f64,
    pub feed_in: f64,
    pub autarky_pct: f64,
    pub pv_generation: f64,
    pub co2_today: f64,
    pub co2_after: f64,
    pub co2_saving: f64,
    pub break_even_years: Option<f64>,
    pub annual_cost_post: f64,
    pub total_cost: f64,
    pub household_block: f64,
    pub climate_block: f64,
    pub ev_block: f64,
    pub heatpump_block: f64,
    /// Building heating demand before heat-pump gating.
    pub heating_demand: f64,
    pub ev_from_batt: f64,
    /// Hard findings in check order.
    pub issues: Vec<String>,
    /// Soft findings in check order.
    pub warnings: Vec<String>,
    /// Rules that fired, in check order.
    pub rules: Vec<RuleId>,
    pub status: Status,
}

impl ScenarioRecord {
    /// Flattens one evaluated scenario of `input`.
    pub fn new(input: &BuildingInput, result: &ScenarioResult) -> Self {
        let validation = &result.validation;
        let balance = &result.balance;
        let economics = &result.economics;

        Self {
            house_type: input.house_type,
            floor_area_sqm: input.floor_area_sqm,
            occupants: input.occupants,
            floor_heating: input.has_floor_heating,
            insulation: input.insulation,
            roof_area_sqm: input.roof_area_sqm,
            climate_control: input.has_climate_control,
            wallbox: input.has_wallbox,
            scenario: result.scenario,
            pv_kwp: round_to(result.sizing.pv_kwp, 2),
            battery_kwh: round_to(result.sizing.battery_kwh, 2),
            grid_import: round_to(balance.grid_import_kwh, 0),
            feed_in: round_to(balance.feed_in_kwh, 0),
            autarky_pct: round_to(balance.autarky_pct, 1),
            pv_generation: round_to(balance.pv_generation_kwh, 0),
            co2_today: round_to(economics.co2_today_kg, 1),
            co2_after: round_to(economics.co2_after_kg, 1),
            co2_saving: round_to(economics.co2_saving_kg, 1),
            break_even_years: economics.break_even_years.map(|y| round_to(y, 1)),
            annual_cost_post: round_to(economics.post_cost_eur, 0),
            total_cost: round_to(economics.total_cost_eur, 0),
            household_block: result.blocks.household,
            climate_block: result.blocks.climate,
            ev_block: result.blocks.ev,
            heatpump_block: result.blocks.heatpump,
            heating_demand: result.building_heating_kwh,
            ev_from_batt: round_to(balance.ev_from_battery_kwh, 0),
            issues: validation.issues().map(|v| v.message.clone()).collect(),
            warnings: validation.warnings().map(|v| v.message.clone()).collect(),
            rules: validation.violations.iter().map(|v| v.rule).collect(),
            status: validation.status(),
        }
    }
}

/// Warning share within one group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub warned: usize,
    pub total: usize,
}

impl GroupCount {
    /// Share of rows in the group carrying at least one warning (%).
    pub fn warned_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.warned as f64 / self.total as f64
        }
    }
}

/// Aggregate view over all records of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub ok_rows: usize,
    pub warning_rows: usize,
    pub error_rows: usize,
    /// Occurrences per distinct issue message.
    pub issue_counts: BTreeMap<String, usize>,
    /// Occurrences per distinct warning message.
    pub warning_counts: BTreeMap<String, usize>,
    /// Warning share per scenario, in evaluation order.
    pub warnings_by_scenario: Vec<GroupCount>,
    /// Warning share per house type, in matrix order.
    pub warnings_by_house_type: Vec<GroupCount>,
    /// Follow-ups for every rule that fired.
    pub recommendations: Vec<String>,
    /// Critical figures that are NaN or infinite.
    pub non_finite_values: usize,
    /// Inputs that could not be evaluated.
    pub failed_inputs: usize,
}

impl RunSummary {
    /// Computes the summary from the complete record table.
    pub fn from_records(records: &[ScenarioRecord]) -> Self {
        let mut summary = Self {
            total_rows: records.len(),
            ..Self::default()
        };
        let mut by_scenario: Vec<GroupCount> = Vec::new();
        let mut by_house: Vec<GroupCount> = Vec::new();
        let mut fired: Vec<RuleId> = Vec::new();

        for r in records {
            match r.status {
                Status::Ok => summary.ok_rows += 1,
                Status::Warning => summary.warning_rows += 1,
                Status::Error => summary.error_rows += 1,
            }
            for msg in &r.issues {
                *summary.issue_counts.entry(msg.clone()).or_insert(0) += 1;
            }
            for msg in &r.warnings {
                *summary.warning_counts.entry(msg.clone()).or_insert(0) += 1;
            }
            let warned = !r.warnings.is_empty();
            tally(&mut by_scenario, r.scenario.label(), warned);
            tally(&mut by_house, r.house_type.as_str(), warned);

            for rule in &r.rules {
                if !fired.contains(rule) {
                    fired.push(*rule);
                }
            }

            let critical = [r.pv_kwp, r.battery_kwh, r.grid_import, r.feed_in, r.autarky_pct];
            summary.non_finite_values += critical.iter().filter(|v| !v.is_finite()).count();
        }

        fired.sort();
        let mut recommendations: Vec<String> = Vec::new();
        for rule in fired {
            let text = rule.remediation().to_string();
            if !recommendations.contains(&text) {
                recommendations.push(text);
            }
        }

        summary.warnings_by_scenario = by_scenario;
        summary.warnings_by_house_type = by_house;
        summary.recommendations = recommendations;
        summary
    }

    /// Records how many inputs failed before producing rows.
    pub fn with_failed_inputs(mut self, failed_inputs: usize) -> Self {
        self.failed_inputs = failed_inputs;
        self
    }

    fn pct(&self, count: usize) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.total_rows as f64
        }
    }
}

fn tally(groups: &mut Vec<GroupCount>, name: &str, warned: bool) {
    let idx = match groups.iter().position(|g| g.group == name) {
        Some(idx) => idx,
        None => {
            groups.push(GroupCount {
                group: name.to_string(),
                warned: 0,
                total: 0,
            });
            groups.len() - 1
        }
    };
    groups[idx].total += 1;
    if warned {
        groups[idx].warned += 1;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(f, "Rows:            {}", self.total_rows)?;
        writeln!(
            f,
            "OK:              {} ({:.1}%)",
            self.ok_rows,
            self.pct(self.ok_rows)
        )?;
        writeln!(
            f,
            "Warnings:        {} ({:.1}%)",
            self.warning_rows,
            self.pct(self.warning_rows)
        )?;
        writeln!(
            f,
            "Errors:          {} ({:.1}%)",
            self.error_rows,
            self.pct(self.error_rows)
        )?;
        writeln!(f, "Failed inputs:   {}", self.failed_inputs)?;
        writeln!(f, "Non-finite:      {}", self.non_finite_values)?;

        if !self.issue_counts.is_empty() {
            writeln!(f, "\nIssues:")?;
            for (msg, count) in &self.issue_counts {
                writeln!(f, "  {count:5}  {msg}")?;
            }
        }
        if !self.warning_counts.is_empty() {
            writeln!(f, "\nWarnings:")?;
            for (msg, count) in &self.warning_counts {
                writeln!(f, "  {count:5}  {msg}")?;
            }
        }

        writeln!(f, "\nWarning share by scenario:")?;
        for g in &self.warnings_by_scenario {
            writeln!(
                f,
                "  {:<26} {:5.1}% ({}/{})",
                g.group,
                g.warned_pct(),
                g.warned,
                g.total
            )?;
        }
        writeln!(f, "Warning share by house type:")?;
        for g in &self.warnings_by_house_type {
            writeln!(
                f,
                "  {:<26} {:5.1}% ({}/{})",
                g.group,
                g.warned_pct(),
                g.warned,
                g.total
            )?;
        }

        if !self.recommendations.is_empty() {
            writeln!(f, "\nRecommended actions:")?;
            for rec in &self.recommendations {
                writeln!(f, "  - {rec}")?;
            }
        }
        Ok(())
    }
}

/// Optional equality filters over record columns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordFilter {
    pub house_type: Option<HouseType>,
    pub floor_area_sqm: Option<f64>,
    pub occupants: Option<u32>,
    pub insulation: Option<Insulation>,
    pub floor_heating: Option<bool>,
    pub climate_control: Option<bool>,
    pub wallbox: Option<bool>,
    pub scenario: Option<Scenario>,
    pub status: Option<Status>,
}

impl RecordFilter {
    pub fn matches(&self, r: &ScenarioRecord) -> bool {
        self.house_type.is_none_or(|v| v == r.house_type)
            && self.floor_area_sqm.is_none_or(|v| v == r.floor_area_sqm)
            && self.occupants.is_none_or(|v| v == r.occupants)
            && self.insulation.is_none_or(|v| v == r.insulation)
            && self.floor_heating.is_none_or(|v| v == r.floor_heating)
            && self.climate_control.is_none_or(|v| v == r.climate_control)
            && self.wallbox.is_none_or(|v| v == r.wallbox)
            && self.scenario.is_none_or(|v| v == r.scenario)
            && self.status.is_none_or(|v| v == r.status)
    }
}

/// Most economical matching records first.
///
/// Records without a break-even are skipped; ties keep table order.
pub fn rank_by_break_even<'a>(
    records: &'a [ScenarioRecord],
    filter: &RecordFilter,
    limit: usize,
) -> Vec<&'a ScenarioRecord> {
    let mut ranked: Vec<(f64, &ScenarioRecord)> = records
        .iter()
        .filter(|r| filter.matches(r))
        .filter_map(|r| r.break_even_years.map(|y| (y, r)))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.into_iter().take(limit).map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketConfig;
    use crate::sim::scenario::evaluate_building;

    fn input(house_type: HouseType, roof: f64) -> BuildingInput {
        BuildingInput {
            house_type,
            floor_area_sqm: 150.0,
            occupants: 3,
            has_floor_heating: false,
            insulation: Insulation::Normal,
            roof_area_sqm: roof,
            has_climate_control: true,
            has_wallbox: false,
        }
    }

    fn records_for(inputs: &[BuildingInput]) -> Vec<ScenarioRecord> {
        let market = MarketConfig::baseline();
        inputs
            .iter()
            .flat_map(|i| {
                evaluate_building(&market, i)
                    .expect("baseline market covers every house type")
                    .into_iter()
                    .map(move |r| ScenarioRecord::new(i, &r))
            })
            .collect()
    }

    fn make_record(scenario: Scenario, status: Status, break_even: Option<f64>) -> ScenarioRecord {
        let mut r = records_for(&[input(HouseType::Rowhouse, 50.0)])[0].clone();
        r.scenario = scenario;
        r.status = status;
        r.break_even_years = break_even;
        r.issues.clear();
        r.warnings.clear();
        r.rules.clear();
        r
    }

    #[test]
    fn round_to_breaks_ties_to_even() {
        assert_eq!(round_to(242.25, 1), 242.2);
        assert_eq!(round_to(1058.5, 0), 1058.0);
        assert_eq!(round_to(1059.5, 0), 1060.0);
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(0.126, 2), 0.13);
    }

    #[test]
    fn record_rounds_reported_figures() {
        let records = records_for(&[input(HouseType::Rowhouse, 50.0)]);
        assert_eq!(records.len(), 3);
        let r = &records[0];
        assert_eq!(r.scenario, Scenario::PvOnly);
        assert_eq!(r.pv_kwp, 6.0);
        assert!((r.grid_import - 2518.5).abs() <= 0.5);
        assert_eq!(r.grid_import.fract(), 0.0);
        assert_eq!(r.autarky_pct, 27.0);
        assert_eq!(r.break_even_years, Some(15.3));
        assert_eq!(r.heating_demand, 15000.0);
        assert_eq!(r.status, Status::Ok);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn record_keeps_one_message_per_rule() {
        let records = records_for(&[input(HouseType::Detached, 30.0)]);
        for r in &records {
            assert_eq!(r.issues.len() + r.warnings.len(), r.rules.len());
        }
        // 30 sqm roof caps PV at 4 kWp, below the 6 kWp floor
        assert!(records.iter().all(|r| r.pv_kwp == 4.0));
        assert!(records.iter().all(|r| !r.rules.contains(&RuleId::RoofLimit)));
    }

    #[test]
    fn summary_counts_statuses() {
        let records = vec![
            make_record(Scenario::PvOnly, Status::Ok, Some(10.0)),
            make_record(Scenario::PvBattery, Status::Warning, Some(12.0)),
            make_record(Scenario::PvBattery, Status::Error, None),
        ];
        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.ok_rows, 1);
        assert_eq!(summary.warning_rows, 1);
        assert_eq!(summary.error_rows, 1);
        assert_eq!(summary.non_finite_values, 0);
    }

    #[test]
    fn summary_groups_messages_and_recommendations() {
        let mut a = make_record(Scenario::PvOnly, Status::Warning, Some(10.0));
        a.warnings = vec!["Grid import too low (<200 kWh/a)".to_string()];
        a.rules = vec![RuleId::GridImportTooLow];
        let mut b = a.clone();
        b.house_type = HouseType::Detached;
        b.warnings.push("Break-even very long".to_string());
        b.rules = vec![RuleId::GridImportTooLow, RuleId::BreakEvenTooLong];
        let c = make_record(Scenario::PvBattery, Status::Ok, Some(9.0));

        let summary = RunSummary::from_records(&[a, b, c]);
        assert_eq!(
            summary.warning_counts.get("Grid import too low (<200 kWh/a)"),
            Some(&2)
        );
        assert_eq!(summary.warning_counts.get("Break-even very long"), Some(&1));
        assert_eq!(summary.recommendations.len(), 2);
        assert_eq!(summary.warnings_by_scenario.len(), 2);
        assert_eq!(summary.warnings_by_scenario[0].group, "PV only");
        assert_eq!(summary.warnings_by_scenario[0].warned_pct(), 100.0);
        assert_eq!(summary.warnings_by_scenario[1].warned, 0);
        assert_eq!(summary.warnings_by_house_type[0].group, "rowhouse");
    }

    #[test]
    fn summary_display_has_sections() {
        let records = records_for(&[input(HouseType::Rowhouse, 30.0)]);
        let text = RunSummary::from_records(&records).with_failed_inputs(2).to_string();
        assert!(text.contains("--- Run Summary ---"));
        assert!(text.contains("Failed inputs:   2"));
        assert!(text.contains("Warning share by scenario:"));
    }

    #[test]
    fn ranking_sorts_by_break_even_and_skips_undefined() {
        let records = vec![
            make_record(Scenario::PvOnly, Status::Ok, Some(14.0)),
            make_record(Scenario::PvBattery, Status::Ok, None),
            make_record(Scenario::PvBatteryHeatPump, Status::Ok, Some(9.5)),
            make_record(Scenario::PvBattery, Status::Warning, Some(11.0)),
        ];
        let ranked = rank_by_break_even(&records, &RecordFilter::default(), 10);
        let years: Vec<Option<f64>> = ranked.iter().map(|r| r.break_even_years).collect();
        assert_eq!(years, vec![Some(9.5), Some(11.0), Some(14.0)]);

        let ok_only = RecordFilter {
            status: Some(Status::Ok),
            ..RecordFilter::default()
        };
        assert_eq!(rank_by_break_even(&records, &ok_only, 1).len(), 1);
        assert_eq!(
            rank_by_break_even(&records, &ok_only, 1)[0].scenario,
            Scenario::PvBatteryHeatPump
        );
    }
}
