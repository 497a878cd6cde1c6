//! Residential retrofit sizing and plausibility checks over a building matrix.

/// REST API over a completed run.
#[cfg(feature = "api")]
pub mod api;
pub mod building;
/// Market configuration and model constants.
pub mod config;
/// Export of records and summaries.
pub mod io;
pub mod market;
pub mod matrix;
pub mod report;
pub mod runner;
/// Consumption, sizing, energy balance, scenarios, and validation.
pub mod sim;
