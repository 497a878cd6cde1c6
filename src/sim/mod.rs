/// Annual demand decomposition.
pub mod consumption;
pub mod energy_balance;
/// Scenario variants and cost/CO2 evaluation.
pub mod scenario;
pub mod sizing;
/// Plausibility rules and structured findings.
pub mod validation;
