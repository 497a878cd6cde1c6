//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, RecordEntry, RecordsQuery, SummaryResponse};

/// `GET /summary` → 200 + `SummaryResponse` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        market: state.market.clone(),
        summary: state.summary.clone(),
    })
}

/// Returns records, optionally filtered by row range and columns.
///
/// `GET /records` → 200 + `Vec<RecordEntry>` JSON
/// `GET /records?from=N&to=M&scenario=pv_battery` → filtered rows (range inclusive)
/// `GET /records?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<RecordEntry> = state
        .records
        .iter()
        .enumerate()
        .filter(|(row, r)| *row >= from && *row <= to && query.matches(r))
        .map(|(row, r)| RecordEntry::new(row, r))
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::MarketConfig;
    use crate::matrix::build_input_matrix;
    use crate::runner::run_matrix;

    fn make_test_state() -> Arc<AppState> {
        let market = MarketConfig::baseline();
        let inputs: Vec<_> = build_input_matrix().into_iter().take(8).collect();
        let run = run_matrix(&market, &inputs);
        Arc::new(AppState {
            summary: run.summary(),
            records: run.records,
            market,
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn summary_returns_200() {
        let (status, json) = get_json("/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("market").is_some());
        assert_eq!(json["summary"]["total_rows"], 24);
    }

    #[tokio::test]
    async fn records_returns_all_rows() {
        let (status, json) = get_json("/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
        assert_eq!(json[0]["row"], 0);
        assert_eq!(json[0]["scenario"], "pv_only");
    }

    #[tokio::test]
    async fn records_range_query() {
        let (status, json) = get_json("/records?from=3&to=8").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["row"], 3);
        assert_eq!(rows[5]["row"], 8);
    }

    #[tokio::test]
    async fn records_filter_by_scenario() {
        let (status, json) = get_json("/records?scenario=pv_battery_heat_pump").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|r| r["scenario"] == "pv_battery_heat_pump"));
        assert!(rows.iter().all(|r| r["heatpump_block"] == 5500.0));
    }

    #[tokio::test]
    async fn records_invalid_range_returns_400() {
        let (status, json) = get_json("/records?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn records_unknown_scenario_is_rejected() {
        let app = router(make_test_state());
        let req = Request::builder()
            .uri("/records?scenario=wind")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
