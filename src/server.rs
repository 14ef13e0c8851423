//! Local development server (`ragbox serve`).
//!
//! Serves the RAG in a Box HTTP API over an [`InMemoryDocumentStore`], so the
//! client, the ingest command, and the integration tests can run without a
//! real deployment. Retrieval is keyword matching and `query` answers with
//! the best matching chunk; there is no LLM behind it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Liveness, with version |
//! | `GET`    | `/health/ready` | Readiness, with document count |
//! | `POST`   | `/api/v1/documents` | Upload with a generated id |
//! | `GET`    | `/api/v1/documents` | List documents |
//! | `DELETE` | `/api/v1/documents` | Delete everything |
//! | `PUT`    | `/api/v1/documents/{id}` | Idempotent upsert |
//! | `DELETE` | `/api/v1/documents/{id}` | Delete one |
//! | `POST`   | `/api/v1/query` | Extractive answer + contexts |
//! | `POST`   | `/api/v1/search` | Ranked chunks |
//! | `POST`   | `/api/v1/sync` | Reconcile against a keep-set |
//! | `GET`    | `/api/v1/sync/status` | Sync bookkeeping |
//! | `GET`    | `/api/v1/sync/documents` | Ids of all stored documents |
//! | `GET`    | `/api/v1/stats` | Store statistics |
//! | `GET`    | `/api/v1/config` | Server settings |
//! | `GET`    | `/api/v1/config/providers` | Configured providers (none) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document 'a.md' not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use ragbox_core::error::StoreError;
use ragbox_core::models::{
    DocumentList, QueryRequest, QueryResult, Reconciliation, SearchRequest, SearchResult,
    SyncRequest, SyncStatus, SyncedDocuments, UploadRequest, UploadResponse, UpsertOutcome,
    UpsertRequest,
};
use ragbox_core::store::memory::{InMemoryDocumentStore, StoreStats, DEFAULT_TOP_K};
use ragbox_core::store::DocumentStore;

use crate::config::Config;

#[derive(Clone)]
struct AppState {
    store: Arc<InMemoryDocumentStore>,
}

/// Bind `[server].bind` and serve until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryDocumentStore::with_max_tokens(
        config.server.max_tokens,
    ));
    let listener = TcpListener::bind(&config.server.bind).await?;
    println!(
        "ragbox dev server listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

/// Serve on an already-bound listener. Used by tests with port 0.
pub async fn serve(listener: TcpListener, store: Arc<InMemoryDocumentStore>) -> anyhow::Result<()> {
    axum::serve(listener, router(store)).await?;
    Ok(())
}

/// The full route table over `store`.
pub fn router(store: Arc<InMemoryDocumentStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/health/ready", get(handle_ready))
        .route(
            "/api/v1/documents",
            get(handle_list).post(handle_upload).delete(handle_delete_all),
        )
        .route(
            "/api/v1/documents/{id}",
            put(handle_upsert).delete(handle_delete),
        )
        .route("/api/v1/query", post(handle_query))
        .route("/api/v1/search", post(handle_search))
        .route("/api/v1/sync", post(handle_sync))
        .route("/api/v1/sync/status", get(handle_sync_status))
        .route("/api/v1/sync/documents", get(handle_synced_documents))
        .route("/api/v1/stats", get(handle_stats))
        .route("/api/v1/config", get(handle_config))
        .route("/api/v1/config/providers", get(handle_providers))
        .layer(cors)
        .with_state(AppState { store })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Status { status, body } => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let code = match status {
                    StatusCode::BAD_REQUEST => "bad_request",
                    StatusCode::NOT_FOUND => "not_found",
                    _ => "internal",
                };
                AppError {
                    status,
                    code,
                    message: body,
                }
            }
            StoreError::InvalidRequest(message) => bad_request(message),
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

type ApiResult<T> = Result<T, AppError>;

// ============ Health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "store": "memory",
        "documents": state.store.len(),
    }))
}

// ============ Documents ============

async fn handle_upload(
    State(state): State<AppState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let Json(request) = body?;
    let response = state.store.upload_document(&request).await?;
    debug!(document_id = %response.document_id, chunks = response.chunks, "uploaded");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn handle_upsert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpsertRequest>, JsonRejection>,
) -> ApiResult<Json<UpsertOutcome>> {
    let Json(request) = body?;
    let outcome = state.store.upsert_document(&id, &request).await?;
    debug!(document_id = %id, action = %outcome.action, chunks = outcome.chunks, "upsert");
    Ok(Json(outcome))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_document(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_delete_all(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.store.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_list(State(state): State<AppState>) -> ApiResult<Json<DocumentList>> {
    Ok(Json(state.store.list_documents().await?))
}

// ============ Retrieval ============

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Json(request) = body?;
    Ok(Json(state.store.query(&request).await?))
}

async fn handle_search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResult>> {
    let Json(request) = body?;
    Ok(Json(state.store.search(&request).await?))
}

// ============ Sync ============

/// An empty body means "no keep-set": bookkeeping only, nothing pruned.
async fn handle_sync(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Reconciliation>> {
    let request: SyncRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SyncRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| bad_request(format!("invalid sync request: {}", e)))?
    };
    let result = state
        .store
        .sync(request.keep_document_ids.as_deref())
        .await?;
    info!(
        pruned = result.pruned_count,
        keep_set = request.keep_document_ids.as_ref().map(Vec::len),
        "sync"
    );
    Ok(Json(result))
}

async fn handle_sync_status(State(state): State<AppState>) -> ApiResult<Json<SyncStatus>> {
    Ok(Json(state.store.sync_status().await?))
}

async fn handle_synced_documents(
    State(state): State<AppState>,
) -> ApiResult<Json<SyncedDocuments>> {
    let document_ids = state.store.synced_document_ids().await?;
    Ok(Json(SyncedDocuments { document_ids }))
}

// ============ Operational ============

async fn handle_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.store.stats())
}

async fn handle_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "store": "memory",
        "maxTokens": state.store.max_tokens(),
        "defaultTopK": DEFAULT_TOP_K,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_providers() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "embedding": null,
        "llm": null,
        "retrieval": "keyword",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_status_maps_to_http_status() {
        let err = AppError::from(StoreError::not_found("document 'x' not found"));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "not_found");

        let err = AppError::from(StoreError::bad_request("contentHash mismatch"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");

        let err = AppError::from(StoreError::InvalidRequest("empty id".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = AppError::from(StoreError::Transport("boom".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal");
    }
}
