use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::building::BuildingInput;
use crate::config::{ConfigError, MarketConfig};
use crate::matrix::build_input_matrix;
use crate::report::{RunSummary, ScenarioRecord};
use crate::sim::scenario::evaluate_building;

/// An input that produced no records.
#[derive(Debug)]
pub struct InputFailure {
    pub input: BuildingInput,
    pub error: ConfigError,
}

/// Outcome of evaluating a set of building inputs.
#[derive(Debug, Default)]
pub struct MatrixRun {
    /// Three records per successful input, in input then scenario order.
    pub records: Vec<ScenarioRecord>,
    pub failures: Vec<InputFailure>,
}

impl MatrixRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.records).with_failed_inputs(self.failures.len())
    }
}

/// Evaluates every input under every scenario.
///
/// Inputs are processed in parallel; record order still follows `inputs`.
/// A failing input is logged and recorded, the remaining inputs still run.
pub fn run_matrix(market: &MarketConfig, inputs: &[BuildingInput]) -> MatrixRun {
    info!(inputs = inputs.len(), "evaluating building matrix");

    let outcomes: Vec<Result<Vec<ScenarioRecord>, InputFailure>> = inputs
        .par_iter()
        .map(|input| match evaluate_building(market, input) {
            Ok(results) => Ok(results
                .iter()
                .map(|r| ScenarioRecord::new(input, r))
                .collect()),
            Err(error) => Err(InputFailure {
                input: *input,
                error,
            }),
        })
        .collect();

    let mut run = MatrixRun {
        records: Vec::with_capacity(inputs.len() * 3),
        failures: Vec::new(),
    };
    for outcome in outcomes {
        match outcome {
            Ok(records) => {
                for r in &records {
                    if !r.issues.is_empty() {
                        debug!(input = %BuildingLabel(r), scenario = %r.scenario, issues = ?r.issues, "scenario flagged");
                    }
                }
                run.records.extend(records);
            }
            Err(failure) => {
                warn!(input = %failure.input, error = %failure.error, "input skipped");
                run.failures.push(failure);
            }
        }
    }

    info!(
        records = run.records.len(),
        failures = run.failures.len(),
        "matrix evaluated"
    );
    run
}

/// Evaluates the full 972-building matrix.
pub fn run_full_matrix(market: &MarketConfig) -> MatrixRun {
    run_matrix(market, &build_input_matrix())
}

struct BuildingLabel<'a>(&'a ScenarioRecord);

impl std::fmt::Display for BuildingLabel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.0;
        write!(
            f,
            "{} {}sqm {}p {} roof {}sqm",
            r.house_type, r.floor_area_sqm, r.occupants, r.insulation, r.roof_area_sqm
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{HouseType, Insulation};

    fn input(house_type: HouseType) -> BuildingInput {
        BuildingInput {
            house_type,
            floor_area_sqm: 100.0,
            occupants: 1,
            has_floor_heating: true,
            insulation: Insulation::Good,
            roof_area_sqm: 80.0,
            has_climate_control: false,
            has_wallbox: true,
        }
    }

    #[test]
    fn records_follow_input_order() {
        let inputs = [input(HouseType::Detached), input(HouseType::Rowhouse)];
        let run = run_matrix(&MarketConfig::baseline(), &inputs);
        assert!(run.failures.is_empty());
        assert_eq!(run.records.len(), 6);
        assert!(run.records[..3].iter().all(|r| r.house_type == HouseType::Detached));
        assert!(run.records[3..].iter().all(|r| r.house_type == HouseType::Rowhouse));
    }

    #[test]
    fn missing_heating_entry_is_isolated() {
        let mut market = MarketConfig::baseline();
        market.consumption.heating_per_sqm.remove("freestanding");
        let inputs = [input(HouseType::Detached), input(HouseType::SemiDetached)];
        let run = run_matrix(&market, &inputs);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].input.house_type, HouseType::Detached);
        assert!(matches!(run.failures[0].error, ConfigError::MissingKey { .. }));
        assert_eq!(run.records.len(), 3);
        assert_eq!(run.summary().failed_inputs, 1);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let market = MarketConfig::baseline();
        let inputs: Vec<BuildingInput> = build_input_matrix().into_iter().take(24).collect();
        let a = run_matrix(&market, &inputs);
        let b = run_matrix(&market, &inputs);
        assert_eq!(a.records, b.records);
    }
}
