//! The remote document store contract.
//!
//! [`DocumentStore`] is the seam between the sync coordinator and whatever
//! actually holds the documents: the HTTP client in the `ragbox` crate, the
//! [`memory::InMemoryDocumentStore`] used by tests and the dev server, or a
//! caller-supplied fake.
//!
//! | Method | Wire operation |
//! |--------|----------------|
//! | [`upsert_document`](DocumentStore::upsert_document) | `PUT /api/v1/documents/{id}` |
//! | [`upload_document`](DocumentStore::upload_document) | `POST /api/v1/documents` |
//! | [`delete_document`](DocumentStore::delete_document) | `DELETE /api/v1/documents/{id}` |
//! | [`delete_all`](DocumentStore::delete_all) | `DELETE /api/v1/documents` |
//! | [`list_documents`](DocumentStore::list_documents) | `GET /api/v1/documents` |
//! | [`search`](DocumentStore::search) | `POST /api/v1/search` |
//! | [`query`](DocumentStore::query) | `POST /api/v1/query` |
//! | [`sync`](DocumentStore::sync) | `POST /api/v1/sync` |
//! | [`sync_status`](DocumentStore::sync_status) | `GET /api/v1/sync/status` |
//! | [`synced_document_ids`](DocumentStore::synced_document_ids) | `GET /api/v1/sync/documents` |

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{
    DocumentList, QueryRequest, QueryResult, Reconciliation, SearchRequest, SearchResult,
    SyncStatus, UploadRequest, UploadResponse, UpsertOutcome, UpsertRequest,
};

/// A document store reachable by the sync coordinator.
///
/// Implementations must be `Send + Sync`; each call is one suspension point
/// and carries no reentrancy guarantee.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or update `id`. The store decides between `created`,
    /// `updated`, and `unchanged`.
    async fn upsert_document(&self, id: &str, request: &UpsertRequest)
        -> StoreResult<UpsertOutcome>;

    /// Add a document under a store-assigned id. Not idempotent.
    async fn upload_document(&self, request: &UploadRequest) -> StoreResult<UploadResponse>;

    async fn delete_document(&self, id: &str) -> StoreResult<()>;

    async fn delete_all(&self) -> StoreResult<()>;

    async fn list_documents(&self) -> StoreResult<DocumentList>;

    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResult>;

    async fn query(&self, request: &QueryRequest) -> StoreResult<QueryResult>;

    /// Reconcile against a keep-set. `None` prunes nothing and only records
    /// that a sync happened; `Some(&[])` prunes every document.
    async fn sync(&self, keep_document_ids: Option<&[String]>) -> StoreResult<Reconciliation>;

    async fn sync_status(&self) -> StoreResult<SyncStatus>;

    async fn synced_document_ids(&self) -> StoreResult<Vec<String>>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    async fn upsert_document(
        &self,
        id: &str,
        request: &UpsertRequest,
    ) -> StoreResult<UpsertOutcome> {
        (**self).upsert_document(id, request).await
    }

    async fn upload_document(&self, request: &UploadRequest) -> StoreResult<UploadResponse> {
        (**self).upload_document(request).await
    }

    async fn delete_document(&self, id: &str) -> StoreResult<()> {
        (**self).delete_document(id).await
    }

    async fn delete_all(&self) -> StoreResult<()> {
        (**self).delete_all().await
    }

    async fn list_documents(&self) -> StoreResult<DocumentList> {
        (**self).list_documents().await
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<SearchResult> {
        (**self).search(request).await
    }

    async fn query(&self, request: &QueryRequest) -> StoreResult<QueryResult> {
        (**self).query(request).await
    }

    async fn sync(&self, keep_document_ids: Option<&[String]>) -> StoreResult<Reconciliation> {
        (**self).sync(keep_document_ids).await
    }

    async fn sync_status(&self) -> StoreResult<SyncStatus> {
        (**self).sync_status().await
    }

    async fn synced_document_ids(&self) -> StoreResult<Vec<String>> {
        (**self).synced_document_ids().await
    }
}
