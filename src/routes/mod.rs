//! HTTP surface: the read-only dashboard API.

pub mod dashboard;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;
use dashboard::{health_check, list_tickers, price_series, summary_table};

/// Builds the dashboard router. GET-only; there is no mutation path.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health",          get(health_check))
        .route("/api/tickers",         get(list_tickers))
        .route("/api/prices/:ticker",  get(price_series))
        .route("/api/summary",         get(summary_table))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use tower::ServiceExt;

    use crate::models::{NewObservation, PriceSnapshot, TickerSummary};
    use crate::state::build_state;
    use crate::store::PriceStore;

    async fn app() -> Router {
        let store = PriceStore::in_memory().await.unwrap();
        store.ensure_schema().await.unwrap();

        let now = Utc::now();
        for (ticker, price) in [("AAPL", 190.0), ("AAPL", 191.0), ("MSFT", 410.0)] {
            let obs = NewObservation::from_snapshot(ticker, now, &PriceSnapshot::new(price, Some(185.0), None));
            store.append_observation(&obs).await.unwrap();
        }
        store
            .upsert_summary(&TickerSummary {
                ticker:         "AAPL".into(),
                first_price:    190.0,
                last_price:     191.0,
                min_price:      190.0,
                max_price:      191.0,
                avg_price:      190.5,
                pct_change_24h: Some(0.526),
                last_updated:   now,
            })
            .await
            .unwrap();

        router(build_state(store))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn tickers_endpoint_lists_distinct_symbols() {
        let (status, body) = get_json(app().await, "/api/tickers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], serde_json::json!(["AAPL", "MSFT"]));
    }

    #[tokio::test]
    async fn prices_endpoint_returns_series_in_order() {
        let (status, body) = get_json(app().await, "/api/prices/aapl?hours=6").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["count"], 2);
        assert_eq!(body["observations"][0]["price"], 190.0);
        assert_eq!(body["observations"][1]["price"], 191.0);
    }

    #[tokio::test]
    async fn prices_endpoint_rejects_out_of_range_hours() {
        let (status, body) = get_json(app().await, "/api/prices/AAPL?hours=72").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (status, _) = get_json(app().await, "/api/prices/AAPL?hours=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn prices_endpoint_rejects_non_numeric_hours_with_json() {
        let (status, body) = get_json(app().await, "/api/prices/AAPL?hours=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap().contains("hours"));
    }

    #[tokio::test]
    async fn summary_endpoint_returns_table() {
        let (status, body) = get_json(app().await, "/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["summary"][0]["ticker"], "AAPL");
    }

    #[tokio::test]
    async fn mutation_methods_are_not_routed() {
        let resp = app()
            .await
            .oneshot(Request::builder().method("POST").uri("/api/summary").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
