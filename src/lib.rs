//! # ragbox
//!
//! Client SDK and incremental ingest CLI for a RAG in a Box server.
//!
//! The protocol logic (fingerprints, the local sync cache, the store
//! contract, and the [`SyncCoordinator`](ragbox_core::coordinator::SyncCoordinator))
//! lives in [`ragbox_core`], whose modules are re-exported here. This crate adds the
//! HTTP transport, the directory ingester, a local dev server, and the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────────┐   ┌──────────────┐        ┌────────────┐
//! │ ingest dir │──▶│ SyncCoordinator │──▶│ RagboxClient │──HTTP──▶│ RAG server │
//! └────────────┘   │  + SyncCache    │   └──────────────┘        │ (or serve) │
//!                  └─────────────────┘                           └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ragbox::client::RagboxClient;
//! use ragbox::coordinator::SyncCoordinator;
//! use ragbox::models::Document;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = RagboxClient::new("http://localhost:8080", Duration::from_secs(30))?;
//! let mut sync = SyncCoordinator::new(client);
//!
//! let docs = vec![Document::new("intro.md", "# Intro\n\nHello.")];
//! for item in sync.upsert_batch(&docs).await {
//!     println!("{}: {:?}", item.document_id, item.result.map(|o| o.action));
//! }
//!
//! let keep: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
//! sync.sync(Some(keep.as_slice())).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration |
//! | [`client`] | HTTP `DocumentStore` and operational endpoints |
//! | [`ingest`] | Directory ingestion with prune |
//! | [`progress`] | Ingest progress on stderr |
//! | [`server`] | In-memory dev server |
//! | [`documents`], [`search`], [`status`] | CLI command bodies |
//! | [`logging`] | tracing subscriber setup |

pub mod client;
pub mod config;
pub mod documents;
pub mod ingest;
pub mod logging;
pub mod progress;
pub mod search;
pub mod server;
pub mod status;

pub use ragbox_core::{cache, chunk, coordinator, error, fingerprint, models, store};
