use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use common::MonitorSnapshot;

use crate::AppState;

pub fn status_router() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(all_monitors))
        .route("/api/status/:exchange/:symbol", get(one_monitor))
}

async fn all_monitors(State(state): State<AppState>) -> Json<Vec<MonitorSnapshot>> {
    Json(state.board.snapshots().await)
}

async fn one_monitor(
    State(state): State<AppState>,
    Path((exchange, symbol)): Path<(String, String)>,
) -> Result<Json<MonitorSnapshot>, StatusCode> {
    state
        .board
        .get(&format!("{exchange}:{symbol}"))
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use common::{MonitorSnapshot, StatusBoard};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{router, AppState};

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn board_with_two() -> StatusBoard {
        let board = StatusBoard::new();
        let mut btc = MonitorSnapshot::new("BTCUSD-PERP", "cryptocom", "1h");
        btc.cycles = 5;
        board.publish(btc).await;
        board
            .publish(MonitorSnapshot::new("ETHUSDT", "binance", "4h"))
            .await;
        board
    }

    #[tokio::test]
    async fn healthz_reports_monitor_count() {
        let (status, body) = get(AppState::new(board_with_two().await), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["monitors"], 2);
        assert!(body["uptime_secs"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn status_lists_snapshots_by_key() {
        let (status, body) = get(AppState::new(board_with_two().await), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["exchange"], "binance");
        assert_eq!(list[1]["symbol"], "BTCUSD-PERP");
        assert_eq!(list[1]["cycles"], 5);
    }

    #[tokio::test]
    async fn single_monitor_lookup() {
        let state = AppState::new(board_with_two().await);
        let (status, body) = get(state.clone(), "/api/status/cryptocom/BTCUSD-PERP").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timeframe"], "1h");

        let (status, _) = get(state, "/api/status/bybit/BTCUSDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
