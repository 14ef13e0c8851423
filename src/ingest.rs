//! Directory ingestion (`ragbox ingest <dir>`).
//!
//! Walks a directory, turns each matching file into a [`Document`] keyed by
//! its relative path, pushes the documents through a [`SyncCoordinator`],
//! and finally reconciles the server against the set of files that exist.
//!
//! ```text
//! scan dir ──► file_to_document ──► coordinator.upsert ──► sync(keep-set) ──► status
//! ```
//!
//! Re-running on an unchanged tree costs one upsert round-trip per file (the
//! server answers `unchanged`); files deleted from disk are pruned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use ragbox_core::coordinator::SyncCoordinator;
use ragbox_core::error::StoreResult;
use ragbox_core::models::{Document, SyncStatus, UpsertAction, UpsertOutcome};
use ragbox_core::store::DocumentStore;

use crate::client::RagboxClient;
use crate::config::{normalize_extensions, Config};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/target/**", "**/node_modules/**"];

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub dir: PathBuf,
    /// Leading-dot form, e.g. `.md`.
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub prune: bool,
    pub exclude_globs: Vec<String>,
    /// Extra attempts per document for retryable failures.
    pub max_retries: u32,
}

impl IngestOptions {
    /// Options for `dir` taken from the `[ingest]` and `[client]` config sections.
    pub fn from_config(dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            dir: dir.into(),
            extensions: normalize_extensions(&config.ingest.extensions),
            recursive: config.ingest.recursive,
            prune: config.ingest.prune,
            exclude_globs: config.ingest.exclude_globs.clone(),
            max_retries: config.client.max_retries,
        }
    }
}

/// Counts from one ingest run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub discovered: usize,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub failed_ids: Vec<String>,
    /// Ids produced by more than one discovered file.
    pub duplicate_ids: Vec<String>,
    /// `None` when pruning was skipped.
    pub pruned: Option<u64>,
    pub status: Option<SyncStatus>,
}

impl IngestReport {
    fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome.action {
            UpsertAction::Created => self.created += 1,
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Unchanged => self.unchanged += 1,
        }
    }
}

/// Full ingest against a server: directory check, file scan, health check,
/// upserts, reconciliation, final status.
pub async fn run_ingest(
    client: RagboxClient,
    opts: &IngestOptions,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestReport> {
    if !opts.dir.is_dir() {
        bail!("Directory not found: {}", opts.dir.display());
    }

    progress.report(IngestProgressEvent::Scanning {
        dir: opts.dir.display().to_string(),
    });
    let files = scan_directory(opts)?;
    if files.is_empty() {
        println!(
            "No files found matching extensions: {}",
            opts.extensions.join(", ")
        );
        return Ok(IngestReport::default());
    }

    println!("Found {} files to process", files.len());
    println!("Connecting to: {}", client.base_url());

    let health = client
        .health()
        .await
        .with_context(|| format!("Error connecting to server at {}", client.base_url()))?;
    println!("Server status: {}", health.status);

    let mut coordinator = SyncCoordinator::new(client);
    ingest_files(&mut coordinator, &files, opts, progress).await
}

/// Upsert `files` (absolute paths under `opts.dir`) and reconcile.
pub async fn ingest_files<S: DocumentStore>(
    coordinator: &mut SyncCoordinator<S>,
    files: &[PathBuf],
    opts: &IngestOptions,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestReport> {
    let total = files.len() as u64;
    let mut report = IngestReport {
        discovered: files.len(),
        ..IngestReport::default()
    };
    // Every discovered file stays in the keep-set, including ones that
    // failed this run, so a transient error never prunes the server copy.
    let mut keep_ids = Vec::with_capacity(files.len());
    let mut seen: HashMap<String, &Path> = HashMap::with_capacity(files.len());

    for (i, path) in files.iter().enumerate() {
        let relative = path.strip_prefix(&opts.dir).unwrap_or(path);
        let id = document_id(relative);
        match seen.get(&id) {
            Some(first) => {
                warn!(
                    document_id = %id,
                    first = %first.display(),
                    second = %path.display(),
                    "two files map to the same document id; the later one wins"
                );
                if !report.duplicate_ids.contains(&id) {
                    report.duplicate_ids.push(id.clone());
                }
            }
            None => {
                seen.insert(id.clone(), path.as_path());
                keep_ids.push(id.clone());
            }
        }

        let result = match file_to_document(path, &opts.dir) {
            Ok(doc) => upsert_with_retry(coordinator, &doc, opts.max_retries)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                report.record(&outcome);
                if outcome.action != UpsertAction::Unchanged {
                    println!("  [{}] {}", outcome.action, id);
                }
            }
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(document_id = %id, %error, "ingest failed");
                report.failed += 1;
                report.failed_ids.push(id);
            }
        }

        progress.report(IngestProgressEvent::Uploading {
            n: i as u64 + 1,
            total,
        });
    }

    println!();
    println!("Ingestion complete:");
    println!("  Created:   {}", report.created);
    println!("  Updated:   {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Failed:    {}", report.failed);

    if opts.prune {
        println!();
        println!("Syncing and pruning orphaned documents...");
        progress.report(IngestProgressEvent::Reconciling {
            keep: keep_ids.len() as u64,
        });
        let reconciled = coordinator
            .sync(Some(keep_ids.as_slice()))
            .await
            .context("Sync failed")?;
        println!("  Pruned: {} documents", reconciled.pruned_count);
        report.pruned = Some(reconciled.pruned_count);
    }

    let status = coordinator
        .status()
        .await
        .context("Failed to fetch sync status")?;
    println!();
    println!("Final state:");
    println!("  Documents: {}", status.document_count);
    println!("  Chunks:    {}", status.chunk_count);
    report.status = Some(status);

    Ok(report)
}

async fn upsert_with_retry<S: DocumentStore>(
    coordinator: &mut SyncCoordinator<S>,
    doc: &Document,
    max_retries: u32,
) -> StoreResult<UpsertOutcome> {
    let mut attempt: u32 = 0;
    loop {
        match coordinator.upsert(doc).await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = Duration::from_secs(1u64 << (attempt - 1).min(5));
                warn!(
                    document_id = %doc.id,
                    attempt,
                    error = %e,
                    "retrying in {}s",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

/// Files under `opts.dir` whose extension is listed, minus excluded paths.
/// Sorted by path.
pub fn scan_directory(opts: &IngestOptions) -> Result<Vec<PathBuf>> {
    let root = &opts.dir;
    if !root.is_dir() {
        bail!("Directory not found: {}", root.display());
    }

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(opts.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut walker = WalkDir::new(root).follow_links(false);
    if !opts.recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            continue;
        }
        let Some(ext) = suffix(path) else {
            continue;
        };
        if opts.extensions.iter().any(|e| *e == ext) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Stable document id for a path relative to the ingest root.
pub fn document_id(relative: &Path) -> String {
    relative
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Read `path` (invalid UTF-8 replaced) into a document keyed by its path
/// relative to `base`.
pub fn file_to_document(path: &Path, base: &Path) -> Result<Document> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let relative = path.strip_prefix(base).unwrap_or(path);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Document::new(document_id(relative), content)
        .with_metadata("filename", filename)
        .with_metadata("path", relative.to_string_lossy())
        .with_metadata("extension", suffix(path).unwrap_or_default()))
}

/// Last extension with its dot (`notes.tar.gz` → `.gz`).
fn suffix(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude glob: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}
