//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::building::HouseType;
use crate::config::MarketConfig;
use crate::report::{RunSummary, ScenarioRecord};
use crate::sim::scenario::Scenario;
use crate::sim::validation::Status;

/// Market configuration of the run plus its summary.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub market: MarketConfig,
    pub summary: RunSummary,
}

/// One record with its row index in the result table.
#[derive(Debug, Serialize)]
pub struct RecordEntry {
    pub row: usize,
    #[serde(flatten)]
    pub record: ScenarioRecord,
}

impl RecordEntry {
    pub fn new(row: usize, record: &ScenarioRecord) -> Self {
        Self {
            row,
            record: record.clone(),
        }
    }
}

/// Optional filters for the records endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    /// First row index (inclusive).
    pub from: Option<usize>,
    /// Last row index (inclusive).
    pub to: Option<usize>,
    pub scenario: Option<Scenario>,
    pub status: Option<Status>,
    pub house_type: Option<HouseType>,
}

impl RecordsQuery {
    pub fn matches(&self, record: &ScenarioRecord) -> bool {
        self.scenario.is_none_or(|s| s == record.scenario)
            && self.status.is_none_or(|s| s == record.status)
            && self.house_type.is_none_or(|h| h == record.house_type)
    }
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
