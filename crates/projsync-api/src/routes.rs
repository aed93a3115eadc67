use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use projsync_core::models::{
    AuditEntry, AuditSummaryRow, ConflictResolution, DownloadRequest, SyncConflict, SyncRequest,
    SyncResponse, SyncStatusReport, UploadResult,
};
use projsync_core::SyncCoordinator;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;

const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 1_000;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    coordinator: Arc<Mutex<SyncCoordinator>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, coordinator: SyncCoordinator) -> Self {
        Self {
            config,
            coordinator: Arc::new(Mutex::new(coordinator)),
        }
    }

    /// Run a core operation on the blocking pool with exclusive access to the coordinator
    async fn run<T, F>(&self, operation: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&SyncCoordinator) -> projsync_core::Result<T> + Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = coordinator.blocking_lock();
            operation(&guard)
        })
        .await
        .map_err(|error| AppError::internal(format!("sync task failed: {error}")))?;
        Ok(outcome?)
    }
}

pub fn app_router(state: AppState) -> Router {
    let sync_routes = Router::new()
        .route("/sync/upload", post(upload))
        .route("/sync/download", get(download))
        .route("/sync/status", get(status))
        .route("/sync/resolve", post(resolve))
        .route("/sync/conflicts", get(conflicts))
        .route("/sync/audit", get(audit))
        .route("/sync/audit/summary", get(audit_summary));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", sync_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn upload(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<UploadResult>, AppError> {
    let table = request.table_name.clone();
    let records = request.records.len();
    let result = state
        .run(move |coordinator| coordinator.upload_batch(&request))
        .await?;
    tracing::info!(
        endpoint = "sync_upload",
        table = %table,
        records,
        success = result.success_count,
        failed = result.failed_count,
        conflicts = result.conflict_count,
        replayed = result.replayed,
        "Processed upload batch"
    );
    Ok(Json(result))
}

async fn download(
    State(state): State<AppState>,
    Query(request): Query<DownloadRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let response = state
        .run(move |coordinator| coordinator.download(&request))
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    device_id: String,
}

async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SyncStatusReport>, AppError> {
    let report = state
        .run(move |coordinator| coordinator.sync_status(&query.device_id))
        .await?;
    Ok(Json(report))
}

async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ConflictResolution>,
) -> Result<StatusCode, AppError> {
    state
        .run(move |coordinator| coordinator.resolve_conflict(&request))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictsQuery {
    table_name: Option<String>,
    limit: Option<usize>,
}

async fn conflicts(
    State(state): State<AppState>,
    Query(query): Query<ConflictsQuery>,
) -> Result<Json<Vec<SyncConflict>>, AppError> {
    let limit = list_limit(query.limit);
    let conflicts = state
        .run(move |coordinator| coordinator.open_conflicts(query.table_name.as_deref(), limit))
        .await?;
    Ok(Json(conflicts))
}

#[derive(Debug, Default, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

async fn audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = list_limit(query.limit);
    let entries = state
        .run(move |coordinator| coordinator.recent_audit(limit))
        .await?;
    Ok(Json(entries))
}

#[derive(Debug, Default, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    since: i64,
}

async fn audit_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<AuditSummaryRow>>, AppError> {
    let rows = state
        .run(move |coordinator| coordinator.audit_summary(query.since))
        .await?;
    Ok(Json(rows))
}

fn list_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use projsync_core::Database;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            database_path: PathBuf::from(":memory:"),
            request_cache_ttl: Duration::from_secs(600),
            request_cache_capacity: 16,
            download_page_limit: None,
        });
        let coordinator = SyncCoordinator::new(Database::open_in_memory().unwrap())
            .with_config(config.engine_config());
        app_router(AppState::new(config, coordinator))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn healthz_reports_ok() {
        let router = test_router();
        let (status, body) = send(&router, get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_then_download_round_trip() {
        let router = test_router();
        let (status, body) = send(
            &router,
            post_json(
                "/v1/sync/upload",
                &json!({
                    "tableName": "projects",
                    "deviceId": "device-a",
                    "records": [{"id": "p1", "name": "Alpha"}, {"id": "p2"}]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["successCount"], 1);
        assert_eq!(body["failedCount"], 1);

        let (status, body) = send(
            &router,
            get("/v1/sync/download?tableName=projects&lastSyncedAt=0&deviceId=device-b"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newRecords"][0]["id"], "p1");
        assert_eq!(body["stats"]["newCount"], 1);
        assert_eq!(body["hasMore"], false);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_table_is_bad_request() {
        let router = test_router();
        let (status, body) = send(
            &router,
            post_json(
                "/v1/sync/upload",
                &json!({"tableName": "users", "deviceId": "device-a", "records": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request: unknown table 'users'");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_lists_every_table() {
        let router = test_router();
        let (status, body) = send(&router, get("/v1/sync/status?deviceId=device-a")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isOnline"], true);
        assert_eq!(body["pendingCounts"].as_object().unwrap().len(), 6);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_returns_no_content_and_clears_conflict() {
        let router = test_router();
        send(
            &router,
            post_json(
                "/v1/sync/upload",
                &json!({
                    "tableName": "projects",
                    "deviceId": "device-a",
                    "records": [{"id": "p1", "name": "Server"}]
                }),
            ),
        )
        .await;
        let (_, body) = send(
            &router,
            post_json(
                "/v1/sync/upload",
                &json!({
                    "tableName": "projects",
                    "deviceId": "device-b",
                    "records": [{"id": "p1", "name": "Stale", "updatedAt": 1}]
                }),
            ),
        )
        .await;
        assert_eq!(body["conflictCount"], 1);

        let (_, open) = send(&router, get("/v1/sync/conflicts?tableName=projects")).await;
        assert_eq!(open.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &router,
            post_json(
                "/v1/sync/resolve",
                &json!({
                    "conflictId": body["conflicts"][0]["conflictId"],
                    "tableName": "projects",
                    "recordId": "p1",
                    "resolution": "remote",
                    "deviceId": "device-b"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, open) = send(&router, get("/v1/sync/conflicts")).await;
        assert!(open.as_array().unwrap().is_empty());

        let (status, audit) = send(&router, get("/v1/sync/audit?limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audit[0]["operation"], "resolve_conflict");
    }

    #[test]
    fn list_limit_is_clamped() {
        assert_eq!(list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(list_limit(Some(0)), 1);
        assert_eq!(list_limit(Some(50_000)), MAX_LIST_LIMIT);
    }
}
