//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use retrofit_sim::building::{BuildingInput, HouseType, Insulation};
use retrofit_sim::config::MarketConfig;
use retrofit_sim::runner::{MatrixRun, run_full_matrix};

/// Reference market configuration.
pub fn market() -> MarketConfig {
    MarketConfig::baseline()
}

/// Rowhouse, 150 m², 3 occupants, normal insulation, 50 m² roof, climate
/// control, no wallbox, no floor heating.
pub fn fixture_input() -> BuildingInput {
    BuildingInput {
        house_type: HouseType::Rowhouse,
        floor_area_sqm: 150.0,
        occupants: 3,
        has_floor_heating: false,
        insulation: Insulation::Normal,
        roof_area_sqm: 50.0,
        has_climate_control: true,
        has_wallbox: false,
    }
}

/// Full 972-input matrix evaluated against the reference market.
pub fn full_run() -> MatrixRun {
    run_full_matrix(&market())
}
