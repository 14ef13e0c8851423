//! # RAG in a Box Core
//!
//! Runtime-agnostic logic for the RAG in a Box client: document models,
//! content fingerprints, the local sync cache, the remote store contract,
//! and the sync coordinator that ties them together.
//!
//! This crate contains no HTTP client, tokio runtime, or filesystem I/O.
//! The HTTP transport lives in the `ragbox` crate and plugs in through the
//! [`store::DocumentStore`] trait.
//!
//! ```rust
//! use ragbox_core::models::Document;
//! use ragbox_core::store::memory::InMemoryDocumentStore;
//! use ragbox_core::coordinator::SyncCoordinator;
//!
//! # async fn example() -> ragbox_core::error::StoreResult<()> {
//! let mut sync = SyncCoordinator::new(InMemoryDocumentStore::new());
//! let doc = Document::new("intro.md", "# Intro\n\nHello.");
//! sync.upsert(&doc).await?;
//! let keep = vec!["intro.md".to_string()];
//! sync.sync(Some(keep.as_slice())).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chunk;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod store;
