//! `ragbox status` and `ragbox health`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use ragbox_core::models::SyncStatus;
use ragbox_core::store::DocumentStore;

use crate::client::RagboxClient;

/// Print sync bookkeeping followed by the server's stats.
pub async fn run_status(client: &RagboxClient) -> Result<()> {
    let status = client
        .sync_status()
        .await
        .context("Failed to fetch sync status")?;

    println!("RAG in a Box status ({})", client.base_url());
    println!();
    print!("{}", render_status(&status, Utc::now()));

    match client.stats().await {
        Ok(stats) => {
            println!();
            println!("  Server stats:");
            print!("{}", render_json_fields(&stats, "    "));
        }
        Err(e) => tracing::debug!(error = %e, "stats unavailable"),
    }
    Ok(())
}

/// Liveness is required; readiness is reported if the server exposes it.
pub async fn run_health(client: &RagboxClient) -> Result<()> {
    let health = client
        .health()
        .await
        .with_context(|| format!("Error connecting to server at {}", client.base_url()))?;
    println!("Server status: {}", health.status);
    for (key, value) in &health.extra {
        println!("  {}: {}", key, scalar(value));
    }

    match client.ready().await {
        Ok(ready) => {
            println!("Readiness:");
            print!("{}", render_json_fields(&ready, "  "));
        }
        Err(e) => println!("Readiness: unavailable ({})", e),
    }
    Ok(())
}

fn render_status(status: &SyncStatus, now: DateTime<Utc>) -> String {
    let last_sync = status
        .last_sync_time
        .map(|t| format_relative(t, now))
        .unwrap_or_else(|| "never".to_string());
    format!(
        "  Last sync:       {}\n  Documents:       {}\n  Chunks:          {}\n  Pending deletes: {}\n",
        last_sync, status.document_count, status.chunk_count, status.pending_deletes
    )
}

/// `3 hours ago`, falling back to an ISO timestamp past 30 days or in the future.
fn format_relative(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - t).num_seconds();
    if delta < 0 || delta >= 86400 * 30 {
        return t.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    }
    let plural = |n: i64, unit: &str| {
        let s = if n == 1 { "" } else { "s" };
        format!("{} {}{} ago", n, unit, s)
    };
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else {
        plural(delta / 86400, "day")
    }
}

/// One `key: value` line per top-level field; nested values as compact JSON.
fn render_json_fields(value: &serde_json::Value, indent: &str) -> String {
    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| format!("{}{}: {}\n", indent, k, scalar(v)))
            .collect(),
        None => format!("{}{}\n", indent, scalar(value)),
    }
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
