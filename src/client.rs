//! HTTP client for the RAG in a Box API.
//!
//! [`RagboxClient`] implements [`DocumentStore`] over reqwest, so it plugs
//! straight into a [`SyncCoordinator`](ragbox_core::coordinator::SyncCoordinator).
//! It also exposes the operational endpoints (health, readiness, stats,
//! config, providers) whose response shapes are server-defined and returned
//! as raw JSON.
//!
//! # Errors
//!
//! - Connection failures → [`StoreError::Transport`]
//! - Timeouts (whole request, including the body) → [`StoreError::Timeout`]
//! - Any non-2xx status → [`StoreError::Status`] carrying the code and body
//! - Unparseable bodies → [`StoreError::Decode`]
//!
//! Nothing is retried here.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use ragbox_core::error::{StoreError, StoreResult};
use ragbox_core::models::{
    DocumentList, Health, QueryRequest, QueryResult, Reconciliation, SearchRequest, SearchResult,
    SyncRequest, SyncStatus, SyncedDocuments, UploadRequest, UploadResponse, UpsertOutcome,
    UpsertRequest,
};
use ragbox_core::store::DocumentStore;

use crate::config::ClientConfig;

/// Longest response body excerpt quoted in decode errors.
const BODY_EXCERPT_LEN: usize = 200;

/// Client for one RAG in a Box server.
#[derive(Debug, Clone)]
pub struct RagboxClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl RagboxClient {
    /// Build a client for `base_url`. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> StoreResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| StoreError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "base URL cannot carry a path: {}",
                base_url
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /health`
    pub async fn health(&self) -> StoreResult<Health> {
        self.get_json(&["health"]).await
    }

    /// `GET /health/ready`
    pub async fn ready(&self) -> StoreResult<serde_json::Value> {
        self.get_json(&["health", "ready"]).await
    }

    /// `GET /api/v1/stats`
    pub async fn stats(&self) -> StoreResult<serde_json::Value> {
        self.get_json(&["api", "v1", "stats"]).await
    }

    /// `GET /api/v1/config`
    pub async fn server_config(&self) -> StoreResult<serde_json::Value> {
        self.get_json(&["api", "v1", "config"]).await
    }

    /// `GET /api/v1/config/providers`
    pub async fn providers(&self) -> StoreResult<serde_json::Value> {
        self.get_json(&["api", "v1", "config", "providers"]).await
    }

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Config(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> StoreResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "request");
        Ok(self.http.request(method, url))
    }

    /// Send and return the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> StoreResult<String> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(StoreError::status(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> StoreResult<T> {
        let body = self.execute(self.request(Method::GET, segments)?).await?;
        decode(&body)
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        payload: &B,
    ) -> StoreResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.request(method, segments)?.json(payload))
            .await?;
        decode(&body)
    }
}

#[async_trait]
impl DocumentStore for RagboxClient {
    async fn upsert_document(
        &self,
        id: &str,
        request: &UpsertRequest,
    ) -> StoreResult<UpsertOutcome> {
        check_document_id(id)?;
        self.send_json(Method::PUT, &["api", "v1", "documents", id], request)
            .await
    }

    async fn upload_document(&self, request: &UploadRequest) -> StoreResult<UploadResponse> {
        let payload = UploadRequest {
            metadata: request.metadata.clone().filter(|m| !m.is_empty()),
            collection: non_empty(&request.collection),
            ..request.clone()
        };
        self.send_json(Method::POST, &["api", "v1", "documents"], &payload)
            .await
    }

    async fn delete_document(&self, id: &str) -> StoreResult<()> {
        check_document_id(id)?;
        self.execute(self.request(Method::DELETE, &["api", "v1", "documents", id])?)
            .await
            .map(|_| ())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.execute(self.request(Method::DELETE, &["api", "v1", "documents"])?)
            .await
            .map(|_| ())
    }

    async fn list_documents(&self) -> StoreResult<DocumentList> {
        self.get_json(&["api", "v1", "documents"]).await
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResult> {
        let payload = SearchRequest {
            query: request.query.clone(),
            top_k: request.top_k.filter(|k| *k > 0),
            collection: non_empty(&request.collection),
        };
        self.send_json(Method::POST, &["api", "v1", "search"], &payload)
            .await
    }

    async fn query(&self, request: &QueryRequest) -> StoreResult<QueryResult> {
        let payload = QueryRequest {
            question: request.question.clone(),
            top_k: request.top_k.filter(|k| *k > 0),
            collection: non_empty(&request.collection),
        };
        self.send_json(Method::POST, &["api", "v1", "query"], &payload)
            .await
    }

    async fn sync(&self, keep_document_ids: Option<&[String]>) -> StoreResult<Reconciliation> {
        let request = self.request(Method::POST, &["api", "v1", "sync"])?;
        // No keep-set means no body at all.
        let request = match keep_document_ids {
            Some(ids) => request.json(&SyncRequest {
                keep_document_ids: Some(ids.to_vec()),
            }),
            None => request,
        };
        let body = self.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(Reconciliation::default());
        }
        decode(&body)
    }

    async fn sync_status(&self) -> StoreResult<SyncStatus> {
        self.get_json(&["api", "v1", "sync", "status"]).await
    }

    async fn synced_document_ids(&self) -> StoreResult<Vec<String>> {
        let synced: SyncedDocuments = self.get_json(&["api", "v1", "sync", "documents"]).await?;
        Ok(synced.document_ids)
    }
}

/// Ids that cannot be a single path segment. `url` drops `.` and `..`
/// segments, which would turn `/documents/..` into `/documents`.
fn check_document_id(id: &str) -> StoreResult<()> {
    match id {
        "" => Err(StoreError::InvalidRequest(
            "document id must not be empty".to_string(),
        )),
        "." | ".." => Err(StoreError::InvalidRequest(format!(
            "document id {:?} is not addressable",
            id
        ))),
        _ => Ok(()),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn decode<T: DeserializeOwned>(body: &str) -> StoreResult<T> {
    serde_json::from_str(body).map_err(|e| {
        let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
        StoreError::Decode(format!("{} (body: {})", e, excerpt))
    })
}

fn transport_error(err: reqwest::Error) -> StoreError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    if err.is_timeout() {
        StoreError::Timeout(message)
    } else {
        StoreError::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragbox_core::models::Document;

    fn client(base: &str) -> RagboxClient {
        RagboxClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn urls_join_segments() {
        let c = client("http://localhost:8080");
        assert_eq!(
            c.url(&["api", "v1", "sync", "status"]).unwrap().as_str(),
            "http://localhost:8080/api/v1/sync/status"
        );
    }

    #[test]
    fn trailing_slash_and_prefix_are_kept_clean() {
        let c = client("http://example.com/ragbox/");
        assert_eq!(c.base_url(), "http://example.com/ragbox");
        assert_eq!(
            c.url(&["health"]).unwrap().as_str(),
            "http://example.com/ragbox/health"
        );
    }

    #[test]
    fn document_ids_are_percent_encoded() {
        let c = client("http://localhost:8080");
        let url = c.url(&["api", "v1", "documents", "notes/a b?.md"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/documents/notes%2Fa%20b%3F.md"
        );
    }

    #[test]
    fn dot_segment_ids_are_rejected() {
        for id in ["", ".", ".."] {
            let err = check_document_id(id).unwrap_err();
            assert!(matches!(err, StoreError::InvalidRequest(_)), "{:?}", id);
        }
        check_document_id("..md").unwrap();
        check_document_id("a.b").unwrap();
    }

    #[tokio::test]
    async fn delete_dot_dot_never_reaches_the_server() {
        // Nothing listens on port 1; a request would fail with Transport.
        let c = client("http://127.0.0.1:1");
        let err = c.delete_document("..").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
        let doc = Document::new(".", "x");
        let err = c
            .upsert_document(".", &UpsertRequest::new(&doc, "0".repeat(64)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = RagboxClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn decode_error_quotes_body() {
        let err = decode::<SyncStatus>("<html>oops</html>").unwrap_err();
        match err {
            StoreError::Decode(msg) => assert!(msg.contains("<html>oops</html>")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
