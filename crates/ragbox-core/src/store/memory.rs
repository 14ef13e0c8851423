//! In-memory [`DocumentStore`] for tests and the local dev server.
//!
//! Implements the store side of the sync protocol: fingerprint-checked
//! upserts that report `created`/`updated`/`unchanged`, keep-set pruning,
//! and sync bookkeeping. Retrieval is plain term matching over chunks and
//! `query` answers with the best matching chunk; there is no embedding or
//! generation behind it.
//!
//! All state sits behind one `RwLock`, so a reconciliation is atomic with
//! respect to concurrent upserts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::error::{StoreError, StoreResult};
use crate::fingerprint::fingerprint;
use crate::models::{
    ContextItem, DocumentList, DocumentSummary, QueryRequest, QueryResult, Reconciliation,
    SearchRequest, SearchResult, SyncStatus, UploadRequest, UploadResponse, UpsertAction,
    UpsertOutcome, UpsertRequest,
};

use super::DocumentStore;

/// Chunk size used by [`InMemoryDocumentStore::new`].
pub const DEFAULT_MAX_TOKENS: usize = 700;

/// Results returned by search and query when the request has no `topK`.
pub const DEFAULT_TOP_K: usize = 5;

struct StoredDocument {
    filename: Option<String>,
    collection: Option<String>,
    content_hash: String,
    metadata: HashMap<String, String>,
    chunks: Vec<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    docs: BTreeMap<String, StoredDocument>,
    last_sync: Option<DateTime<Utc>>,
}

/// Aggregate counts reported by `GET /api/v1/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub document_count: u64,
    pub chunk_count: u64,
    pub content_bytes: u64,
    pub collections: BTreeMap<String, u64>,
}

/// In-memory document store.
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
    max_tokens: usize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_max_tokens(DEFAULT_MAX_TOKENS)
    }

    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().unwrap().docs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted ids of every stored document.
    pub fn ids(&self) -> Vec<String> {
        self.state.read().unwrap().docs.keys().cloned().collect()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read().unwrap();
        let mut collections = BTreeMap::new();
        let mut chunk_count = 0u64;
        let mut content_bytes = 0u64;
        for doc in state.docs.values() {
            chunk_count += doc.chunks.len() as u64;
            content_bytes += doc.chunks.iter().map(|c| c.len() as u64).sum::<u64>();
            let name = doc.collection.clone().unwrap_or_else(|| "default".to_string());
            *collections.entry(name).or_insert(0) += 1;
        }
        StoreStats {
            document_count: state.docs.len() as u64,
            chunk_count,
            content_bytes,
            collections,
        }
    }

    fn retrieve(
        &self,
        text: &str,
        top_k: Option<usize>,
        collection: Option<&str>,
    ) -> StoreResult<Vec<ContextItem>> {
        let lowered = text.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        if terms.is_empty() {
            return Err(StoreError::bad_request("query must not be empty"));
        }
        let limit = top_k.filter(|k| *k > 0).unwrap_or(DEFAULT_TOP_K);

        let state = self.state.read().unwrap();
        let mut hits: Vec<ContextItem> = state
            .docs
            .iter()
            .filter(|(_, doc)| collection.is_none() || doc.collection.as_deref() == collection)
            .flat_map(|(id, doc)| {
                doc.chunks.iter().enumerate().filter_map(|(idx, chunk)| {
                    let chunk_lower = chunk.to_lowercase();
                    let matched = terms.iter().filter(|t| chunk_lower.contains(*t)).count();
                    (matched > 0).then(|| ContextItem {
                        content: chunk.clone(),
                        score: matched as f64 / terms.len() as f64,
                        metadata: doc.metadata.clone(),
                        document_id: Some(id.clone()),
                        chunk_index: Some(idx as u64),
                    })
                })
            })
            .collect();

        // Stable sort keeps (document id, chunk index) order among equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upsert_document(
        &self,
        id: &str,
        request: &UpsertRequest,
    ) -> StoreResult<UpsertOutcome> {
        if id.trim().is_empty() {
            return Err(StoreError::bad_request("document id must not be empty"));
        }
        let computed = fingerprint(&request.content);
        if computed != request.content_hash {
            return Err(StoreError::bad_request(format!(
                "contentHash does not match content for {}",
                id
            )));
        }

        let mut state = self.state.write().unwrap();
        let existing = state.docs.get(id);
        if let Some(doc) = existing.filter(|d| d.content_hash == computed) {
            return Ok(UpsertOutcome {
                document_id: id.to_string(),
                chunks: doc.chunks.len() as u64,
                action: UpsertAction::Unchanged,
                message: "Content unchanged".to_string(),
            });
        }

        let action = if existing.is_some() {
            UpsertAction::Updated
        } else {
            UpsertAction::Created
        };
        let (filename, collection) = existing
            .map(|d| (d.filename.clone(), d.collection.clone()))
            .unwrap_or_default();
        let chunks = chunk_text(&request.content, self.max_tokens);
        let chunk_count = chunks.len() as u64;

        state.docs.insert(
            id.to_string(),
            StoredDocument {
                filename,
                collection,
                content_hash: computed,
                metadata: request.metadata.clone().unwrap_or_default(),
                chunks,
                updated_at: Utc::now(),
            },
        );

        Ok(UpsertOutcome {
            document_id: id.to_string(),
            chunks: chunk_count,
            action,
            message: format!("Document {}", action),
        })
    }

    async fn upload_document(&self, request: &UploadRequest) -> StoreResult<UploadResponse> {
        if request.filename.trim().is_empty() {
            return Err(StoreError::bad_request("filename must not be empty"));
        }
        let id = Uuid::new_v4().to_string();
        let chunks = chunk_text(&request.content, self.max_tokens);
        let chunk_count = chunks.len() as u64;

        self.state.write().unwrap().docs.insert(
            id.clone(),
            StoredDocument {
                filename: Some(request.filename.clone()),
                collection: request.collection.clone(),
                content_hash: fingerprint(&request.content),
                metadata: request.metadata.clone().unwrap_or_default(),
                chunks,
                updated_at: Utc::now(),
            },
        );

        Ok(UploadResponse {
            document_id: id,
            chunks: chunk_count,
        })
    }

    async fn delete_document(&self, id: &str) -> StoreResult<()> {
        match self.state.write().unwrap().docs.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(format!("document not found: {}", id))),
        }
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.state.write().unwrap().docs.clear();
        Ok(())
    }

    async fn list_documents(&self) -> StoreResult<DocumentList> {
        let state = self.state.read().unwrap();
        let documents: Vec<DocumentSummary> = state
            .docs
            .iter()
            .map(|(id, doc)| DocumentSummary {
                id: id.clone(),
                filename: doc.filename.clone(),
                collection: doc.collection.clone(),
                content_hash: Some(doc.content_hash.clone()),
                chunks: doc.chunks.len() as u64,
                metadata: doc.metadata.clone(),
                updated_at: Some(doc.updated_at),
            })
            .collect();
        let total = documents.len() as u64;
        Ok(DocumentList { documents, total })
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResult> {
        let results = self.retrieve(
            &request.query,
            request.top_k,
            request.collection.as_deref(),
        )?;
        let count = results.len();
        Ok(SearchResult { results, count })
    }

    async fn query(&self, request: &QueryRequest) -> StoreResult<QueryResult> {
        let contexts = self.retrieve(
            &request.question,
            request.top_k,
            request.collection.as_deref(),
        )?;
        let answer = contexts
            .first()
            .map(|c| c.content.clone())
            .unwrap_or_else(|| "No relevant context found.".to_string());
        Ok(QueryResult {
            answer,
            contexts,
            usage: None,
        })
    }

    async fn sync(&self, keep_document_ids: Option<&[String]>) -> StoreResult<Reconciliation> {
        let mut state = self.state.write().unwrap();
        let mut pruned_count = 0u64;
        if let Some(keep) = keep_document_ids {
            let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
            let before = state.docs.len();
            state.docs.retain(|id, _| keep.contains(id.as_str()));
            pruned_count = (before - state.docs.len()) as u64;
        }
        state.last_sync = Some(Utc::now());
        Ok(Reconciliation { pruned_count })
    }

    async fn sync_status(&self) -> StoreResult<SyncStatus> {
        let state = self.state.read().unwrap();
        Ok(SyncStatus {
            last_sync_time: state.last_sync,
            document_count: state.docs.len() as u64,
            chunk_count: state.docs.values().map(|d| d.chunks.len() as u64).sum(),
            pending_deletes: 0,
        })
    }

    async fn synced_document_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn request(content: &str) -> UpsertRequest {
        UpsertRequest::new(&Document::new("x", content), fingerprint(content))
    }

    #[tokio::test]
    async fn upsert_reports_created_updated_unchanged() {
        let store = InMemoryDocumentStore::new();

        let first = store.upsert_document("a", &request("one")).await.unwrap();
        assert_eq!(first.action, UpsertAction::Created);
        assert_eq!(first.chunks, 1);

        let again = store.upsert_document("a", &request("one")).await.unwrap();
        assert_eq!(again.action, UpsertAction::Unchanged);
        assert_eq!(again.chunks, 1);

        let changed = store.upsert_document("a", &request("two")).await.unwrap();
        assert_eq!(changed.action, UpsertAction::Updated);
        assert_eq!(changed.message, "Document updated");
    }

    #[tokio::test]
    async fn upsert_rejects_mismatched_hash() {
        let store = InMemoryDocumentStore::new();
        let mut req = request("one");
        req.content_hash = fingerprint("other");
        let err = store.upsert_document("a", &req).await.unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store.delete_document("ghost").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn sync_prunes_complement_of_keep_set() {
        let store = InMemoryDocumentStore::new();
        for id in ["A", "B", "C", "D"] {
            store.upsert_document(id, &request(id)).await.unwrap();
        }
        let keep = vec!["B".to_string(), "D".to_string(), "Z".to_string()];
        let result = store.sync(Some(keep.as_slice())).await.unwrap();
        assert_eq!(result.pruned_count, 2);
        assert_eq!(store.ids(), vec!["B", "D"]);
    }

    #[tokio::test]
    async fn sync_without_keep_set_only_stamps_time() {
        let store = InMemoryDocumentStore::new();
        store.upsert_document("a", &request("alpha")).await.unwrap();
        assert!(store.sync_status().await.unwrap().last_sync_time.is_none());

        let result = store.sync(None).await.unwrap();
        assert_eq!(result.pruned_count, 0);
        let status = store.sync_status().await.unwrap();
        assert_eq!(status.document_count, 1);
        assert!(status.last_sync_time.is_some());
    }

    #[tokio::test]
    async fn sync_with_empty_keep_set_prunes_everything() {
        let store = InMemoryDocumentStore::new();
        store.upsert_document("a", &request("alpha")).await.unwrap();
        store.upsert_document("b", &request("beta")).await.unwrap();
        let result = store.sync(Some(&[][..])).await.unwrap();
        assert_eq!(result.pruned_count, 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn status_counts_chunks() {
        let store = InMemoryDocumentStore::with_max_tokens(3);
        store
            .upsert_document("a", &request("first para\n\nsecond para"))
            .await
            .unwrap();
        let status = store.sync_status().await.unwrap();
        assert_eq!(status.document_count, 1);
        assert_eq!(status.chunk_count, 2);
    }

    #[tokio::test]
    async fn upload_assigns_fresh_ids() {
        let store = InMemoryDocumentStore::new();
        let req = UploadRequest {
            content: "same".to_string(),
            filename: "same.txt".to_string(),
            metadata: None,
            collection: Some("notes".to_string()),
        };
        let a = store.upload_document(&req).await.unwrap();
        let b = store.upload_document(&req).await.unwrap();
        assert_ne!(a.document_id, b.document_id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().collections.get("notes"), Some(&2));
    }

    #[tokio::test]
    async fn search_ranks_by_term_coverage() {
        let store = InMemoryDocumentStore::new();
        store
            .upsert_document("rust", &request("Rust ownership and borrowing"))
            .await
            .unwrap();
        store
            .upsert_document("py", &request("Python borrowing is not a thing"))
            .await
            .unwrap();

        let result = store
            .search(&SearchRequest {
                query: "rust borrowing".to_string(),
                top_k: None,
                collection: None,
            })
            .await
            .unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.results[0].document_id.as_deref(), Some("rust"));
        assert!((result.results[0].score - 1.0).abs() < 1e-9);
        assert!((result.results[1].score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn query_answers_with_best_chunk() {
        let store = InMemoryDocumentStore::new();
        store
            .upsert_document("pg", &request("PostgreSQL is a relational database."))
            .await
            .unwrap();
        let result = store
            .query(&QueryRequest {
                question: "what is postgresql".to_string(),
                top_k: Some(1),
                collection: None,
            })
            .await
            .unwrap();
        assert_eq!(result.answer, "PostgreSQL is a relational database.");
        assert_eq!(result.contexts.len(), 1);

        let err = store
            .query(&QueryRequest {
                question: "   ".to_string(),
                top_k: None,
                collection: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }
}
