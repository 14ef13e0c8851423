//! `ragbox documents list | delete | clear`.

use anyhow::{bail, Context, Result};

use ragbox_core::coordinator::SyncCoordinator;
use ragbox_core::models::{DocumentList, DocumentSummary};
use ragbox_core::store::DocumentStore;

use crate::client::RagboxClient;

pub async fn run_list(client: &RagboxClient) -> Result<()> {
    let list = client
        .list_documents()
        .await
        .context("Failed to list documents")?;
    print!("{}", render_list(&list));
    Ok(())
}

pub async fn run_delete(client: RagboxClient, id: &str) -> Result<()> {
    let mut sync = SyncCoordinator::new(client);
    sync.delete(id)
        .await
        .with_context(|| format!("Failed to delete document '{}'", id))?;
    println!("Deleted {}", id);
    Ok(())
}

pub async fn run_clear(client: RagboxClient, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to delete every document without --yes");
    }
    let mut sync = SyncCoordinator::new(client);
    sync.clear_all()
        .await
        .context("Failed to delete all documents")?;
    println!("All documents deleted.");
    Ok(())
}

fn render_list(list: &DocumentList) -> String {
    if list.documents.is_empty() {
        return "No documents.\n".to_string();
    }

    let mut out = format!(
        "{:<40} {:>6}  {:<12} {}\n",
        "ID", "CHUNKS", "COLLECTION", "UPDATED"
    );
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for doc in &list.documents {
        out.push_str(&render_row(doc));
    }
    out.push_str(&format!("\n{} documents\n", list.total));
    out
}

fn render_row(doc: &DocumentSummary) -> String {
    let updated = doc
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<40} {:>6}  {:<12} {}\n",
        doc.id,
        doc.chunks,
        doc.collection.as_deref().unwrap_or("-"),
        updated
    )
}
