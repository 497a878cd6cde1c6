//! PV and battery sizing heuristics.
//!
//! These are market rules of thumb bounded by roof area, house type, and
//! average PV yield, not an optimizer.

use serde::Serialize;

use crate::building::HouseType;
use crate::config::SizingParams;

/// Proposed system sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingRecommendation {
    pub pv_kwp: f64,
    /// Zero when the scenario has no storage.
    pub battery_kwh: f64,
}

/// Largest PV system the roof can carry (whole kWp).
pub fn roof_limit_kwp(roof_area_sqm: f64, params: &SizingParams) -> f64 {
    (roof_area_sqm / params.roof_sqm_per_kwp).floor().max(0.0)
}

/// Proposes a PV size for the given annual electricity demand.
///
/// The demand-based size is rounded to one decimal and never below
/// `min_pv_kwp`, then capped by roof and house type.
pub fn recommend_pv_kwp(
    annual_demand_kwh: f64,
    roof_area_sqm: f64,
    house_type: HouseType,
    params: &SizingParams,
) -> f64 {
    let base = params
        .min_pv_kwp
        .max(annual_demand_kwh / params.demand_kwh_per_kwp);
    let rounded = (base * 10.0).round() / 10.0;
    rounded
        .min(roof_limit_kwp(roof_area_sqm, params))
        .min(params.house_type_cap_kwp(house_type))
        .max(0.0)
}

/// Daily PV yield of a system (kWh/day).
pub fn daily_pv_yield_kwh(pv_kwp: f64, yield_per_kwp: f64) -> f64 {
    pv_kwp * yield_per_kwp / 365.0
}

/// Proposes a battery capacity (kWh).
///
/// Targets a share of average daily demand clamped to the configured range,
/// but never more than `battery_max_pv_days` of average PV yield.
pub fn recommend_battery_kwh(
    annual_demand_kwh: f64,
    pv_kwp: f64,
    yield_per_kwp: f64,
    params: &SizingParams,
) -> f64 {
    let daily_load = annual_demand_kwh / 365.0;
    let target = (daily_load * params.battery_daily_share)
        .min(params.battery_max_kwh)
        .max(params.battery_min_kwh);
    let ceiling = daily_pv_yield_kwh(pv_kwp, yield_per_kwp) * params.battery_max_pv_days;
    target.min(ceiling)
}
