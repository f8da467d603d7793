use crate::analytics;
use crate::fetcher::BetFilter;
use crate::state::AppState;
use crate::store::DocumentStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;
use tracing::Instrument;

const DEBUG_SAMPLE_SIZE: u32 = 5;

#[derive(Debug, Default, serde::Deserialize)]
pub struct DashboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub match_name: Option<String>,
    pub league: Option<String>,
}

/// GET /api/dashboard_data -- fetch, aggregate, respond. Store failures
/// degrade to empty figures; only bad filters are reported as errors.
pub async fn dashboard_data<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<DashboardQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let span = tracing::info_span!("dashboard_data", request_id = %uuid::Uuid::new_v4());

    async move {
        let filter = match BetFilter::parse(
            params.start_date.as_deref(),
            params.end_date.as_deref(),
            params.match_name.as_deref(),
            params.league.as_deref(),
        ) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "rejected dashboard request");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": e.to_string() })),
                );
            }
        };

        let bets = state.fetcher.fetch(&filter).await;
        if let Some(first) = bets.first() {
            tracing::debug!(sample = ?first, "first bet");
        }

        let data = analytics::build_dashboard(bets, state.recent_limit);
        match serde_json::to_value(&data) {
            Ok(v) => (StatusCode::OK, Json(v)),
            Err(e) => {
                tracing::error!(error = %e, "dashboard serialization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": e.to_string() })),
                )
            }
        }
    }
    .instrument(span)
    .await
}

/// GET /debug/firestore -- small raw sample straight from the store
pub async fn debug_firestore<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.fetcher.sample(DEBUG_SAMPLE_SIZE).await {
        Ok(docs) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "count": docs.len(),
                "sample_data": docs.iter().map(|d| &d.fields).collect::<Vec<_>>(),
                "collection": state.fetcher.collection(),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "debug sample failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::fetcher::BetFetcher;
    use crate::server::router;
    use crate::state::AppState;
    use crate::errors::DashboardResult;
    use crate::store::fake::FakeStore;
    use crate::store::{DocumentStore, RawDocument, RecordQuery};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    fn raw(id: &str, fields: Value) -> RawDocument {
        RawDocument {
            id: id.into(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    fn app(store: FakeStore, static_dir: &Path) -> axum::Router {
        let fetcher = BetFetcher::new(store, "resolved_bets", 10);
        router(AppState::new(fetcher, 50), static_dir)
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn static_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bet_dashboard_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>dashboard</html>").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_dashboard_data_aggregates() {
        let store = FakeStore::with_replies(vec![Ok(vec![
            raw("b3", json!({"outcome": "win", "placed_at": "2024-03-03T12:00:00Z", "league": "EPL"})),
            raw("b2", json!({"outcome": "loss", "placed_at": "2024-03-02T12:00:00Z", "league": "EPL"})),
            raw("b1", json!({"outcome": "win", "placed_at": "2024-03-01T12:00:00Z", "league": "Serie A"})),
        ])]);
        let (status, body) = get(
            app(store, Path::new("static")),
            "/api/dashboard_data?start_date=2024-03-01&end_date=2024-03-31&league=",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["kpis"]["total_bets"], 3);
        assert_eq!(v["kpis"]["net_profit"], 1);
        assert_eq!(v["kpis"]["win_rate"], 66.67);
        assert_eq!(v["performance_by_league"]["EPL"]["win_rate"], 50.0);
        assert_eq!(v["profit_trend"].as_array().map(Vec::len), Some(3));
        assert_eq!(v["recent_bets"][0]["id"], "b3");
    }

    #[tokio::test]
    async fn test_dashboard_data_passes_filters_to_store() {
        let store = std::sync::Arc::new(FakeStore::with_replies(vec![Ok(Vec::new())]));
        let fetcher = BetFetcher::new(SharedStore(store.clone()), "resolved_bets", 10);
        let app = router(AppState::new(fetcher, 50), Path::new("static"));

        let (status, _) = get(app, "/api/dashboard_data?match_name=A%20vs%20B&league=EPL").await;
        assert_eq!(status, StatusCode::OK);

        let queries = store.queries();
        assert_eq!(queries.len(), 1);
        let fields: Vec<&str> = queries[0].filters.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["match", "league"]);
    }

    #[tokio::test]
    async fn test_dashboard_data_store_down_is_empty_ok() {
        let down = app(FakeStore::default(), Path::new("static"));
        let (status, body) = get(down, "/api/dashboard_data").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["kpis"]["total_bets"], 0);
        assert_eq!(v["recent_bets"], json!([]));
    }

    #[tokio::test]
    async fn test_dashboard_data_bad_date_is_400() {
        let (status, body) = get(
            app(FakeStore::default(), Path::new("static")),
            "/api/dashboard_data?start_date=not-a-date",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert!(v["error"].as_str().unwrap().contains("start_date"));
    }

    #[tokio::test]
    async fn test_debug_firestore() {
        let store = FakeStore::with_replies(vec![Ok(vec![raw("x", json!({"outcome": "win"}))])]);
        let (status, body) = get(app(store, Path::new("static")), "/debug/firestore").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["count"], 1);
        assert_eq!(v["collection"], "resolved_bets");
        assert_eq!(v["sample_data"][0], json!({"outcome": "win"}));

        let down = app(FakeStore::default(), Path::new("static"));
        let (status, body) = get(down, "/debug/firestore").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["status"], "error");
    }

    #[tokio::test]
    async fn test_index_page_served() {
        let dir = static_dir();
        let (status, body) = get(app(FakeStore::default(), &dir), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<html>dashboard</html>");
        let _ = std::fs::remove_dir_all(dir);
    }

    /// Lets a test keep a handle on the store after handing it to the router.
    struct SharedStore(std::sync::Arc<FakeStore>);

    impl DocumentStore for SharedStore {
        async fn run_query(&self, query: &RecordQuery) -> DashboardResult<Vec<RawDocument>> {
            self.0.run_query(query).await
        }
    }
}
