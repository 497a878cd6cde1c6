//! Read-only REST API over a completed matrix run.
//!
//! - `/summary` returns the market configuration and run summary
//! - `/records` returns scenario records with optional filters

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::MarketConfig;
use crate::report::{RunSummary, ScenarioRecord};

pub use types::{ErrorResponse, RecordEntry, RecordsQuery, SummaryResponse};

/// Application state shared by all handlers.
///
/// Built once after the run completes; handlers only read it.
pub struct AppState {
    pub market: MarketConfig,
    pub summary: RunSummary,
    pub records: Vec<ScenarioRecord>,
}

/// Builds the router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/records", get(handlers::get_records))
        .with_state(state)
}

/// Binds to `addr` and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
