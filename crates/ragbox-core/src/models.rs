//! Data models for documents and the RAG in a Box wire protocol.
//!
//! Every request and response body is a JSON object with camelCase field
//! names. Fields the server may leave out are `Option` (or `#[serde(default)]`
//! collections), so a missing field is handled where the record is defined
//! rather than at every use site.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fingerprint::fingerprint;

/// A document to be ingested.
///
/// `id` is chosen by the caller and must stay stable across calls for the
/// same logical document. Metadata is carried to the store but is not part
/// of change detection: two documents with the same id and content are the
/// same document to the sync protocol, whatever their metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Builder-style metadata insert.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// SHA-256 fingerprint of the content. Recomputed on every call.
    pub fn content_hash(&self) -> String {
        fingerprint(&self.content)
    }
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
    Unchanged,
}

impl UpsertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertAction::Created => "created",
            UpsertAction::Updated => "updated",
            UpsertAction::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `PUT /api/v1/documents/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub content: String,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl UpsertRequest {
    /// Build a request for `doc` carrying an already computed fingerprint.
    /// Empty metadata is left off the wire.
    pub fn new(doc: &Document, content_hash: String) -> Self {
        Self {
            content: doc.content.clone(),
            content_hash,
            metadata: (!doc.metadata.is_empty()).then(|| doc.metadata.clone()),
        }
    }
}

/// Result of one upsert attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    pub document_id: String,
    pub chunks: u64,
    pub action: UpsertAction,
    pub message: String,
}

impl UpsertOutcome {
    /// Outcome for a document skipped because the local cache already holds
    /// its fingerprint. No request was made.
    pub fn unchanged_locally(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            chunks: 0,
            action: UpsertAction::Unchanged,
            message: "Skipped (unchanged in local cache)".to_string(),
        }
    }
}

/// Body of `POST /api/v1/documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub content: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Response of `POST /api/v1/documents`. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document_id: String,
    pub chunks: u64,
}

/// One entry of `GET /api/v1/documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(alias = "documentId")]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub chunks: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Response of `GET /api/v1/documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
    pub total: u64,
}

/// A retrieved chunk, returned by search and query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<u64>,
}

/// Token accounting reported with a generated answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

/// Body of `POST /api/v1/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Response of `POST /api/v1/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub contexts: Vec<ContextItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Body of `POST /api/v1/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Response of `POST /api/v1/search`. `count` falls back to the number of
/// results when the server leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SearchResultWire")]
pub struct SearchResult {
    pub results: Vec<ContextItem>,
    pub count: usize,
}

#[derive(Deserialize)]
struct SearchResultWire {
    #[serde(default)]
    results: Vec<ContextItem>,
    #[serde(default)]
    count: Option<usize>,
}

impl From<SearchResultWire> for SearchResult {
    fn from(wire: SearchResultWire) -> Self {
        let count = wire.count.unwrap_or(wire.results.len());
        Self {
            results: wire.results,
            count,
        }
    }
}

/// Body of `POST /api/v1/sync`.
///
/// `keep_document_ids: None` is sent as no body at all and means "mark sync
/// complete, prune nothing". `Some(vec![])` prunes everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_document_ids: Option<Vec<String>>,
}

/// Outcome of a reconciliation: how many documents the store pruned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    #[serde(default)]
    pub pruned_count: u64,
}

/// Server-reported sync state. Read-only to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(default, deserialize_with = "deserialize_sync_time")]
    pub last_sync_time: Option<DateTime<Utc>>,
    pub document_count: u64,
    pub chunk_count: u64,
    #[serde(default)]
    pub pending_deletes: u64,
}

/// Response of `GET /api/v1/sync/documents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedDocuments {
    #[serde(default)]
    pub document_ids: Vec<String>,
}

/// Response of `GET /health`. Anything beyond `status` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accepts RFC 3339 (`Z` or numeric offset), an offset-less ISO timestamp
/// taken as UTC, or `null`/`""` for "never synced".
fn deserialize_sync_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let raw = match raw.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(s) => s,
    };
    parse_sync_time(raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid lastSyncTime: {}", raw)))
}

fn parse_sync_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
