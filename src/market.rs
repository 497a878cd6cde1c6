//! Refresh of market prices from externally supplied quotes.
//!
//! A provider returns raw quote text holding a JSON object, possibly wrapped
//! in prose. Quoted values replace configured ones only when they differ by
//! more than a relative tolerance.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::MarketConfig;

/// Relative deviation above which a quoted price replaces the configured one.
pub const DEFAULT_TOLERANCE: f64 = 0.20;

/// Errors while obtaining or parsing price quotes.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("failed to read quotes from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("quote text contains no JSON object")]
    NoJson,

    #[error("quote JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("quote JSON is not an object")]
    NotAnObject,
}

/// Source of raw quote text.
pub trait MarketDataProvider {
    fn fetch_quotes(&self) -> Result<String, MarketDataError>;
}

/// Reads quotes from a file on disk.
#[derive(Debug, Clone)]
pub struct FileQuoteProvider {
    path: PathBuf,
}

impl FileQuoteProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataProvider for FileQuoteProvider {
    fn fetch_quotes(&self) -> Result<String, MarketDataError> {
        fs::read_to_string(&self.path).map_err(|source| MarketDataError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

/// Configuration values that quotes may update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceField {
    Electricity,
    Gas,
    FeedIn,
    PvCostPerKwp,
    BatteryCostPerKwh,
    HeatPumpCostPerKw,
}

impl PriceField {
    pub const ALL: [Self; 6] = [
        Self::Electricity,
        Self::Gas,
        Self::FeedIn,
        Self::PvCostPerKwp,
        Self::BatteryCostPerKwh,
        Self::HeatPumpCostPerKw,
    ];

    /// Key of the field in quote JSON.
    pub fn key(self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Gas => "gas",
            Self::FeedIn => "feed_in",
            Self::PvCostPerKwp => "pv_cost_per_kwp",
            Self::BatteryCostPerKwh => "battery_cost_per_kwh",
            Self::HeatPumpCostPerKw => "heatpump_cost_per_kw",
        }
    }

    /// Dotted path of the field in the configuration.
    pub fn config_path(self) -> &'static str {
        match self {
            Self::Electricity => "prices.electricity_eur_per_kwh",
            Self::Gas => "prices.gas_eur_per_kwh",
            Self::FeedIn => "prices.feed_in_eur_per_kwh",
            Self::PvCostPerKwp => "pv.cost_per_kwp",
            Self::BatteryCostPerKwh => "battery.cost_per_kwh",
            Self::HeatPumpCostPerKw => "heatpump.cost_per_kw",
        }
    }

    pub fn get(self, config: &MarketConfig) -> f64 {
        match self {
            Self::Electricity => config.prices.electricity_eur_per_kwh,
            Self::Gas => config.prices.gas_eur_per_kwh,
            Self::FeedIn => config.prices.feed_in_eur_per_kwh,
            Self::PvCostPerKwp => config.pv.cost_per_kwp,
            Self::BatteryCostPerKwh => config.battery.cost_per_kwh,
            Self::HeatPumpCostPerKw => config.heatpump.cost_per_kw,
        }
    }

    fn slot(self, config: &mut MarketConfig) -> &mut f64 {
        match self {
            Self::Electricity => &mut config.prices.electricity_eur_per_kwh,
            Self::Gas => &mut config.prices.gas_eur_per_kwh,
            Self::FeedIn => &mut config.prices.feed_in_eur_per_kwh,
            Self::PvCostPerKwp => &mut config.pv.cost_per_kwp,
            Self::BatteryCostPerKwh => &mut config.battery.cost_per_kwh,
            Self::HeatPumpCostPerKw => &mut config.heatpump.cost_per_kw,
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_path())
    }
}

/// Numeric quotes keyed by field.
pub type PriceQuotes = BTreeMap<PriceField, f64>;

/// A quote that replaced a configured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceUpdate {
    pub field: PriceField,
    pub previous: f64,
    pub value: f64,
}

/// Extracts numeric quotes from raw provider text.
///
/// Text that is not JSON as a whole is narrowed to the span between the
/// first `{` and the last `}`. Each field accepts its short key or the
/// `<key>_eur_per_kwh` form; non-numeric values are ignored.
pub fn parse_quotes(text: &str) -> Result<PriceQuotes, MarketDataError> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                return Err(MarketDataError::NoJson);
            };
            if end < start {
                return Err(MarketDataError::NoJson);
            }
            serde_json::from_str(&text[start..=end])?
        }
    };
    let Value::Object(map) = value else {
        return Err(MarketDataError::NotAnObject);
    };

    let mut quotes = PriceQuotes::new();
    for field in PriceField::ALL {
        let raw = map
            .get(field.key())
            .or_else(|| map.get(&format!("{}_eur_per_kwh", field.key())));
        if let Some(v) = raw.and_then(Value::as_f64).filter(|v| v.is_finite()) {
            quotes.insert(field, v);
        } else if raw.is_some() {
            debug!(field = field.key(), "ignoring non-numeric quote");
        }
    }
    Ok(quotes)
}

/// Whether `quoted` should replace `current` under `tolerance`.
pub fn needs_update(current: f64, quoted: f64, tolerance: f64) -> bool {
    if current == 0.0 || !current.is_finite() {
        return true;
    }
    (quoted - current).abs() / current.abs() > tolerance
}

/// Applies quotes that deviate from the configuration by more than `tolerance`.
pub fn apply_quotes(config: &mut MarketConfig, quotes: &PriceQuotes, tolerance: f64) -> Vec<PriceUpdate> {
    let mut updates = Vec::new();
    for (&field, &value) in quotes {
        let previous = field.get(config);
        if needs_update(previous, value, tolerance) {
            *field.slot(config) = value;
            info!(field = %field, previous, value, "price updated");
            updates.push(PriceUpdate {
                field,
                previous,
                value,
            });
        }
    }
    if updates.is_empty() {
        info!(tolerance, "all quoted prices within tolerance");
    }
    updates
}

/// Fetches, parses, and applies quotes from `provider`.
pub fn refresh_prices(
    provider: &dyn MarketDataProvider,
    config: &mut MarketConfig,
    tolerance: f64,
) -> Result<Vec<PriceUpdate>, MarketDataError> {
    let text = provider.fetch_quotes()?;
    let quotes = parse_quotes(&text)?;
    Ok(apply_quotes(config, &quotes, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider(&'static str);

    impl MarketDataProvider for StaticProvider {
        fn fetch_quotes(&self) -> Result<String, MarketDataError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parses_plain_json() {
        let quotes = parse_quotes(r#"{"electricity": 0.41, "gas": 0.12}"#).unwrap();
        assert_eq!(quotes.get(&PriceField::Electricity), Some(&0.41));
        assert_eq!(quotes.get(&PriceField::Gas), Some(&0.12));
        assert_eq!(quotes.len(), 2);
    }

    #[test]
    fn extracts_json_from_prose() {
        let text = "Current values:\n{\"feed_in\": 0.082, \"pv_cost_per_kwp\": 1500}\nSource: survey";
        let quotes = parse_quotes(text).unwrap();
        assert_eq!(quotes.get(&PriceField::FeedIn), Some(&0.082));
        assert_eq!(quotes.get(&PriceField::PvCostPerKwp), Some(&1500.0));
    }

    #[test]
    fn accepts_suffixed_keys() {
        let quotes =
            parse_quotes(r#"{"electricity_eur_per_kwh": 0.3, "gas_eur_per_kwh": 0.1}"#).unwrap();
        assert_eq!(quotes.get(&PriceField::Electricity), Some(&0.3));
        assert_eq!(quotes.get(&PriceField::Gas), Some(&0.1));
    }

    #[test]
    fn short_key_wins_over_suffixed() {
        let quotes =
            parse_quotes(r#"{"electricity": 0.4, "electricity_eur_per_kwh": 0.3}"#).unwrap();
        assert_eq!(quotes.get(&PriceField::Electricity), Some(&0.4));
    }

    #[test]
    fn ignores_non_numeric_values() {
        let quotes = parse_quotes(r#"{"electricity": "n/a", "gas": 0.1}"#).unwrap();
        assert!(!quotes.contains_key(&PriceField::Electricity));
        assert_eq!(quotes.len(), 1);
    }

    #[test]
    fn rejects_text_without_json() {
        assert!(matches!(parse_quotes("no data today"), Err(MarketDataError::NoJson)));
        assert!(matches!(parse_quotes("[1, 2]"), Err(MarketDataError::NotAnObject)));
        assert!(matches!(parse_quotes("x { broken } y"), Err(MarketDataError::Json(_))));
    }

    #[test]
    fn tolerance_rule() {
        assert!(needs_update(0.0, 0.3, 0.2));
        assert!(!needs_update(0.35, 0.40, 0.2));
        assert!(needs_update(0.35, 0.45, 0.2));
        assert!(needs_update(0.35, 0.25, 0.2));
    }

    #[test]
    fn applies_only_large_deviations() {
        let mut config = MarketConfig::baseline();
        let quotes = PriceQuotes::from([
            (PriceField::Electricity, 0.38),
            (PriceField::BatteryCostPerKwh, 500.0),
        ]);
        let updates = apply_quotes(&mut config, &quotes, DEFAULT_TOLERANCE);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].field, PriceField::BatteryCostPerKwh);
        assert_eq!(updates[0].previous, 700.0);
        assert_eq!(config.battery.cost_per_kwh, 500.0);
        assert_eq!(config.prices.electricity_eur_per_kwh, 0.35);
    }

    #[test]
    fn zero_configured_value_is_always_replaced() {
        let mut config = MarketConfig::baseline();
        config.prices.feed_in_eur_per_kwh = 0.0;
        let quotes = PriceQuotes::from([(PriceField::FeedIn, 0.081)]);
        let updates = apply_quotes(&mut config, &quotes, DEFAULT_TOLERANCE);
        assert_eq!(updates.len(), 1);
        assert_eq!(config.prices.feed_in_eur_per_kwh, 0.081);
    }

    #[test]
    fn refresh_through_provider() {
        let mut config = MarketConfig::baseline();
        let provider = StaticProvider(r#"Here you go: {"heatpump_cost_per_kw": 2500}"#);
        let updates = refresh_prices(&provider, &mut config, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(config.heatpump.cost_per_kw, 2500.0);
    }

    #[test]
    fn missing_quote_file_is_reported() {
        let provider = FileQuoteProvider::new("does/not/exist.json");
        assert!(matches!(provider.fetch_quotes(), Err(MarketDataError::Read { .. })));
    }
}
