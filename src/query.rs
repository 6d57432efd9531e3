//! Query runner / 查询执行

use std::fmt::Write;

use anyhow::{Context, Result};

use crate::backend::SearchBackend;
use crate::search::schema::{SearchRequest, SearchResults};
use crate::utils::Stopwatch;

/// Run one query and return the rendered console output / 执行查询
pub async fn run_search(backend: &dyn SearchBackend, query: &str) -> Result<String> {
    let stopwatch = Stopwatch::start("search");
    let results = backend
        .search(&SearchRequest::new(query))
        .await
        .with_context(|| format!("search for \"{}\" failed", query))?;
    stopwatch.finish();

    Ok(render(&results, query, backend.capabilities().display_limit))
}

/// Format the first `display_limit` hits, the total and the notation rank / 格式化结果
pub fn render(results: &SearchResults, query: &str, display_limit: usize) -> String {
    let mut out = String::new();
    for hit in results.hits.iter().take(display_limit) {
        let _ = writeln!(out, "{}", hit.notation.as_deref().unwrap_or(&hit.id));
        if let Some(label) = &hit.pref_label {
            let _ = writeln!(out, "  {}", label);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{} total results", results.total);
    match results.notation_rank(query) {
        Some(rank) => {
            let _ = writeln!(out, "notation {} found at rank {}", query, rank + 1);
        }
        None => {
            let _ = writeln!(out, "notation {} not found", query);
        }
    }
    out
}
