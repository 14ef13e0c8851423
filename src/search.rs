//! `ragbox search` and `ragbox query`.

use anyhow::{Context, Result};

use ragbox_core::models::{ContextItem, QueryRequest, QueryResult, SearchRequest};
use ragbox_core::store::DocumentStore;

use crate::client::RagboxClient;

/// Excerpts longer than this are cut at a char boundary.
const EXCERPT_CHARS: usize = 240;

pub async fn run_search(
    client: &RagboxClient,
    query: &str,
    top_k: Option<usize>,
    collection: Option<String>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let request = SearchRequest {
        query: query.to_string(),
        top_k,
        collection,
    };
    let result = client.search(&request).await.context("Search failed")?;

    if result.results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, item) in result.results.iter().enumerate() {
        print!("{}", render_context(i + 1, item));
    }
    println!("{} results", result.count);
    Ok(())
}

pub async fn run_query(
    client: &RagboxClient,
    question: &str,
    top_k: Option<usize>,
    collection: Option<String>,
) -> Result<()> {
    let request = QueryRequest {
        question: question.to_string(),
        top_k,
        collection,
    };
    let result = client.query(&request).await.context("Query failed")?;
    print!("{}", render_answer(&result));
    Ok(())
}

fn render_context(rank: usize, item: &ContextItem) -> String {
    let source = item.document_id.as_deref().unwrap_or("(unknown)");
    let chunk = item
        .chunk_index
        .map(|c| format!(" #{}", c))
        .unwrap_or_default();
    format!(
        "{}. [{:.2}] {}{}\n    excerpt: \"{}\"\n\n",
        rank,
        item.score,
        source,
        chunk,
        excerpt(&item.content)
    )
}

fn render_answer(result: &QueryResult) -> String {
    let mut out = format!("{}\n", result.answer.trim());
    if !result.contexts.is_empty() {
        out.push_str("\nSources:\n");
        for (i, item) in result.contexts.iter().enumerate() {
            out.push_str(&format!(
                "  {}. [{:.2}] {}\n",
                i + 1,
                item.score,
                item.document_id.as_deref().unwrap_or("(unknown)")
            ));
        }
    }
    if let Some(total) = result.usage.and_then(|u| u.total_tokens) {
        out.push_str(&format!("\nTokens: {}\n", total));
    }
    out
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    match flat.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat.to_string(),
    }
}
