//! Sync coordinator: decides when to push, reconciles keep-sets, and keeps
//! the local fingerprint cache consistent with confirmed store state.
//!
//! # Upsert decision
//!
//! 1. Fingerprint the content.
//! 2. If the cache holds the same fingerprint for the id, return
//!    `unchanged` without contacting the store.
//! 3. Otherwise send the upsert. The store decides `created` vs `updated`.
//! 4. Only on success record the fingerprint; on failure the cache is left
//!    exactly as it was and the error is returned.
//!
//! # Reconciliation
//!
//! [`SyncCoordinator::sync`] sends the keep-set, and on success drops every
//! cached id the keep-set does not name. `None` is a bookkeeping-only sync
//! that leaves the cache alone; `Some(&[])` prunes everything.
//!
//! # Concurrency
//!
//! Every operation that touches the cache takes `&mut self`, so the
//! read-cache / call / write-cache sequence for an id cannot interleave with
//! another operation on the same coordinator. Sharing one across tasks
//! requires wrapping it in a lock (e.g. `tokio::sync::Mutex`).

use std::collections::HashSet;

use tracing::{debug, info};

use crate::cache::SyncCache;
use crate::error::StoreResult;
use crate::models::{Document, Reconciliation, SyncStatus, UpsertOutcome, UpsertRequest};
use crate::store::DocumentStore;

/// Result for one document of a batch upsert.
#[derive(Debug)]
pub struct BatchItem {
    pub document_id: String,
    pub result: StoreResult<UpsertOutcome>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Coordinates incremental sync between one client session and a store.
pub struct SyncCoordinator<S> {
    store: S,
    cache: SyncCache,
}

impl<S: DocumentStore> SyncCoordinator<S> {
    /// Coordinator with an empty cache.
    pub fn new(store: S) -> Self {
        Self::with_cache(store, SyncCache::new())
    }

    /// Coordinator seeded with an existing cache.
    pub fn with_cache(store: S, cache: SyncCache) -> Self {
        Self { store, cache }
    }

    /// The underlying store, for calls the coordinator does not wrap.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read-only view of the fingerprints confirmed so far.
    pub fn cache(&self) -> &SyncCache {
        &self.cache
    }

    /// Consume the coordinator. The cache can seed a later one through
    /// [`with_cache`](Self::with_cache).
    pub fn into_parts(self) -> (S, SyncCache) {
        (self.store, self.cache)
    }

    /// Upsert one document, skipping the store when its content is already
    /// known to have been pushed in this session.
    pub async fn upsert(&mut self, doc: &Document) -> StoreResult<UpsertOutcome> {
        let hash = doc.content_hash();

        if self.cache.get(&doc.id) == Some(hash.as_str()) {
            debug!(document_id = %doc.id, "unchanged in local cache, skipping");
            return Ok(UpsertOutcome::unchanged_locally(&doc.id));
        }

        let request = UpsertRequest::new(doc, hash.clone());
        let outcome = self.store.upsert_document(&doc.id, &request).await?;
        debug!(
            document_id = %doc.id,
            action = %outcome.action,
            chunks = outcome.chunks,
            "upserted"
        );
        self.cache.set(doc.id.clone(), hash);
        Ok(outcome)
    }

    /// Upsert each document in order. A failure is recorded for that
    /// document and the batch carries on with the next one.
    pub async fn upsert_batch(&mut self, docs: &[Document]) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            let result = self.upsert(doc).await;
            items.push(BatchItem {
                document_id: doc.id.clone(),
                result,
            });
        }
        items
    }

    /// Reconcile the store against `keep_document_ids`.
    ///
    /// - `Some(ids)`: the store deletes every document not in `ids`; the
    ///   cache is then intersected with `ids`.
    /// - `None`: marks the sync complete without pruning anything, in the
    ///   store or in the cache.
    pub async fn sync(
        &mut self,
        keep_document_ids: Option<&[String]>,
    ) -> StoreResult<Reconciliation> {
        let result = self.store.sync(keep_document_ids).await?;
        if let Some(keep) = keep_document_ids {
            let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
            self.cache.retain(&keep);
        }
        info!(
            pruned = result.pruned_count,
            keep_set = keep_document_ids.map(<[String]>::len),
            "sync complete"
        );
        Ok(result)
    }

    /// Delete one document remotely, then forget it locally.
    pub async fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.store.delete_document(id).await?;
        self.cache.remove(id);
        debug!(document_id = %id, "deleted");
        Ok(())
    }

    /// Delete every document remotely, then clear the cache.
    pub async fn clear_all(&mut self) -> StoreResult<()> {
        self.store.delete_all().await?;
        self.cache.clear();
        info!("cleared all documents");
        Ok(())
    }

    pub async fn status(&self) -> StoreResult<SyncStatus> {
        self.store.sync_status().await
    }

    pub async fn synced_document_ids(&self) -> StoreResult<Vec<String>> {
        self.store.synced_document_ids().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::StoreError;
    use crate::fingerprint::fingerprint;
    use crate::models::{
        DocumentList, QueryRequest, QueryResult, SearchRequest, SearchResult, UpsertAction,
        UploadRequest, UploadResponse,
    };
    use crate::store::memory::InMemoryDocumentStore;

    /// Wraps the in-memory store, counting remote calls and failing any
    /// call that touches an id in `failing`.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryDocumentStore,
        calls: AtomicUsize,
        failing: Mutex<HashSet<String>>,
        fail_everything: Mutex<bool>,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn fail_id(&self, id: &str) {
            self.failing.lock().unwrap().insert(id.to_string());
        }

        fn heal_id(&self, id: &str) {
            self.failing.lock().unwrap().remove(id);
        }

        fn fail_all(&self, on: bool) {
            *self.fail_everything.lock().unwrap() = on;
        }

        fn check(&self, id: Option<&str>) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_everything.lock().unwrap() {
                return Err(StoreError::Transport("connection refused".into()));
            }
            if let Some(id) = id {
                if self.failing.lock().unwrap().contains(id) {
                    return Err(StoreError::Timeout(format!("upsert {}", id)));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn upsert_document(
            &self,
            id: &str,
            request: &UpsertRequest,
        ) -> StoreResult<UpsertOutcome> {
            self.check(Some(id))?;
            self.inner.upsert_document(id, request).await
        }

        async fn upload_document(&self, request: &UploadRequest) -> StoreResult<UploadResponse> {
            self.check(None)?;
            self.inner.upload_document(request).await
        }

        async fn delete_document(&self, id: &str) -> StoreResult<()> {
            self.check(Some(id))?;
            self.inner.delete_document(id).await
        }

        async fn delete_all(&self) -> StoreResult<()> {
            self.check(None)?;
            self.inner.delete_all().await
        }

        async fn list_documents(&self) -> StoreResult<DocumentList> {
            self.check(None)?;
            self.inner.list_documents().await
        }

        async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResult> {
            self.check(None)?;
            self.inner.search(request).await
        }

        async fn query(&self, request: &QueryRequest) -> StoreResult<QueryResult> {
            self.check(None)?;
            self.inner.query(request).await
        }

        async fn sync(&self, keep: Option<&[String]>) -> StoreResult<Reconciliation> {
            self.check(None)?;
            self.inner.sync(keep).await
        }

        async fn sync_status(&self) -> StoreResult<SyncStatus> {
            self.check(None)?;
            self.inner.sync_status().await
        }

        async fn synced_document_ids(&self) -> StoreResult<Vec<String>> {
            self.check(None)?;
            self.inner.synced_document_ids().await
        }
    }

    fn coordinator() -> SyncCoordinator<CountingStore> {
        SyncCoordinator::new(CountingStore::default())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn second_identical_upsert_is_local_noop() {
        let mut sync = coordinator();
        let doc = Document::new("a.md", "alpha");

        let first = sync.upsert(&doc).await.unwrap();
        assert_eq!(first.action, UpsertAction::Created);
        assert_eq!(sync.store().calls(), 1);

        let second = sync.upsert(&doc).await.unwrap();
        assert_eq!(second.action, UpsertAction::Unchanged);
        assert_eq!(second.chunks, 0);
        assert_eq!(second.message, "Skipped (unchanged in local cache)");
        assert_eq!(sync.store().calls(), 1, "second upsert must not hit the store");
    }

    #[tokio::test]
    async fn changed_content_is_pushed_as_update() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a.md", "v1")).await.unwrap();
        let outcome = sync.upsert(&Document::new("a.md", "v2")).await.unwrap();
        assert_eq!(outcome.action, UpsertAction::Updated);
        assert_eq!(sync.cache().get("a.md"), Some(fingerprint("v2").as_str()));
        assert_eq!(sync.store().calls(), 2);
    }

    #[tokio::test]
    async fn metadata_only_edit_is_unchanged() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a.md", "body").with_metadata("v", "1"))
            .await
            .unwrap();
        let outcome = sync
            .upsert(&Document::new("a.md", "body").with_metadata("v", "2"))
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Unchanged);
        assert_eq!(sync.store().calls(), 1);
    }

    #[tokio::test]
    async fn server_decides_created_vs_updated_after_restart() {
        let store = std::sync::Arc::new(CountingStore::default());
        let mut first_session = SyncCoordinator::new(store.clone());
        first_session
            .upsert(&Document::new("a.md", "v1"))
            .await
            .unwrap();

        // Fresh session, empty cache, same store.
        let mut second_session = SyncCoordinator::new(store.clone());
        let outcome = second_session
            .upsert(&Document::new("a.md", "v1"))
            .await
            .unwrap();
        assert_eq!(outcome.action, UpsertAction::Unchanged);
        assert_eq!(outcome.message, "Content unchanged");
        assert_eq!(store.calls(), 2);
        assert!(second_session.cache().contains("a.md"));
    }

    #[tokio::test]
    async fn reconciliation_prunes_exact_complement() {
        let mut sync = coordinator();
        for id in ["A", "B", "C", "D"] {
            sync.upsert(&Document::new(id, format!("content {}", id)))
                .await
                .unwrap();
        }
        let result = sync.sync(Some(ids(&["B", "D"]).as_slice())).await.unwrap();
        assert_eq!(result.pruned_count, 2);
        assert_eq!(sync.store().inner.ids(), vec!["B", "D"]);
        assert_eq!(sync.cache().ids(), vec!["B", "D"]);
    }

    #[tokio::test]
    async fn noop_reconciliation_changes_nothing_but_sync_time() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a", "alpha")).await.unwrap();
        sync.upsert(&Document::new("b", "beta")).await.unwrap();
        let before = sync.status().await.unwrap();
        let cache_before = sync.cache().clone();

        let result = sync.sync(None).await.unwrap();
        assert_eq!(result.pruned_count, 0);

        let after = sync.status().await.unwrap();
        assert_eq!(after.document_count, before.document_count);
        assert_eq!(after.chunk_count, before.chunk_count);
        assert!(after.last_sync_time.is_some());
        assert_eq!(sync.cache(), &cache_before);
    }

    #[tokio::test]
    async fn empty_keep_set_prunes_everything() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a", "alpha")).await.unwrap();
        let result = sync.sync(Some(&[][..])).await.unwrap();
        assert_eq!(result.pruned_count, 1);
        assert!(sync.cache().is_empty());
        assert!(sync.store().inner.is_empty());
    }

    #[tokio::test]
    async fn failed_upsert_leaves_absent_entry_absent() {
        let mut sync = coordinator();
        sync.store().fail_all(true);
        let err = sync.upsert(&Document::new("a", "alpha")).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
        assert!(!sync.cache().contains("a"));
    }

    #[tokio::test]
    async fn failed_upsert_keeps_prior_fingerprint() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a", "v1")).await.unwrap();
        let before = sync.cache().get("a").map(str::to_string);

        sync.store().fail_id("a");
        let err = sync.upsert(&Document::new("a", "v2")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(sync.cache().get("a").map(str::to_string), before);

        // The same call succeeds once the store recovers.
        sync.store().heal_id("a");
        let outcome = sync.upsert(&Document::new("a", "v2")).await.unwrap();
        assert_eq!(outcome.action, UpsertAction::Updated);
    }

    #[tokio::test]
    async fn store_rejection_leaves_cache_untouched() {
        let mut sync = coordinator();
        let err = sync.upsert(&Document::new("  ", "alpha")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert!(sync.cache().is_empty());
    }

    #[tokio::test]
    async fn batch_continues_past_failure_in_order() {
        let mut sync = coordinator();
        sync.store().fail_id("second");
        let docs = vec![
            Document::new("first", "one"),
            Document::new("second", "two"),
            Document::new("third", "three"),
        ];

        let items = sync.upsert_batch(&docs).await;
        assert_eq!(items.len(), 3);
        let order: Vec<&str> = items.iter().map(|i| i.document_id.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);

        assert!(items[0].is_ok());
        assert!(items[1].result.is_err());
        assert!(items[2].is_ok());

        assert!(sync.cache().contains("first"));
        assert!(!sync.cache().contains("second"));
        assert!(sync.cache().contains("third"));
    }

    #[tokio::test]
    async fn delete_then_upsert_goes_to_store() {
        let mut sync = coordinator();
        let doc = Document::new("x", "original");
        sync.upsert(&doc).await.unwrap();

        sync.delete("x").await.unwrap();
        assert!(!sync.cache().contains("x"));

        let outcome = sync.upsert(&doc).await.unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);
        assert_eq!(sync.store().calls(), 3);
    }

    #[tokio::test]
    async fn failed_delete_keeps_cache_entry() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("x", "original")).await.unwrap();
        sync.store().fail_id("x");
        assert!(sync.delete("x").await.is_err());
        assert!(sync.cache().contains("x"));
    }

    #[tokio::test]
    async fn failed_sync_keeps_cache() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a", "alpha")).await.unwrap();
        sync.store().fail_all(true);
        assert!(sync.sync(Some(&[][..])).await.is_err());
        assert!(sync.cache().contains("a"));
    }

    #[tokio::test]
    async fn clear_all_empties_store_and_cache() {
        let mut sync = coordinator();
        sync.upsert(&Document::new("a", "alpha")).await.unwrap();
        sync.upsert(&Document::new("b", "beta")).await.unwrap();

        sync.store().fail_all(true);
        assert!(sync.clear_all().await.is_err());
        assert_eq!(sync.cache().len(), 2);

        sync.store().fail_all(false);
        sync.clear_all().await.unwrap();
        assert!(sync.cache().is_empty());
        assert_eq!(sync.status().await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn seeded_cache_short_circuits() {
        let mut cache = SyncCache::new();
        cache.set("a", fingerprint("alpha"));
        let mut sync = SyncCoordinator::with_cache(CountingStore::default(), cache);
        let outcome = sync.upsert(&Document::new("a", "alpha")).await.unwrap();
        assert_eq!(outcome.action, UpsertAction::Unchanged);
        assert_eq!(sync.store().calls(), 0);
    }
}
