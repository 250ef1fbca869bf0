// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary-spec normalization.
//
// Callers send boundary requests in several shapes (JSON objects, bare
// arrays, comma-separated text).  This module parses them leniently and
// classifies the request: anything unusable collapses into `Trivial`
// (pass-through split) rather than an error.

use serde::Deserialize;
use tracing::debug;

/// Classification of a raw boundary request against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryOutcome {
    /// The request was empty, unparsable, or out of range — the split
    /// degrades to a single pass-through part.
    Trivial,
    /// Sorted, de-duplicated boundary pages, each strictly inside
    /// `(1, page_count)`.  Guaranteed non-empty.
    Valid(Vec<u32>),
}

/// Normalize a raw boundary spec against `page_count`.
///
/// Rules, first match wins: unparsable input, an empty boundary list, or any
/// boundary `b <= 1` or `b >= page_count` all yield `Trivial` — one bad
/// entry degrades the whole request, not just itself.  This function never
/// fails.
pub fn normalize(raw: &str, page_count: u32) -> BoundaryOutcome {
    let Some(values) = parse_raw(raw) else {
        debug!(raw, "boundary spec unparsable, degrading to pass-through");
        return BoundaryOutcome::Trivial;
    };
    if values.is_empty() {
        return BoundaryOutcome::Trivial;
    }

    let mut boundaries = values;
    boundaries.sort_unstable();
    boundaries.dedup();

    if boundaries
        .iter()
        .any(|&b| b <= 1 || b >= i64::from(page_count))
    {
        debug!(
            ?boundaries,
            page_count, "boundary out of range, degrading to pass-through"
        );
        return BoundaryOutcome::Trivial;
    }

    BoundaryOutcome::Valid(boundaries.into_iter().map(|b| b as u32).collect())
}

/// One entry of the `{"pages": [{"page": 5}, ...]}` request shape.
#[derive(Debug, Deserialize)]
struct PageEntry {
    page: i64,
}

/// The accepted JSON request shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Pages { pages: Vec<PageEntry> },
    Separators { separators: Vec<i64> },
    List(Vec<i64>),
    Text(String),
}

/// Parse the raw request into a list of boundary values.
///
/// Returns `None` when the input matches no accepted shape.
fn parse_raw(raw: &str) -> Option<Vec<i64>> {
    if let Ok(spec) = serde_json::from_str::<RawSpec>(raw) {
        return match spec {
            RawSpec::Pages { pages } => Some(pages.into_iter().map(|entry| entry.page).collect()),
            RawSpec::Separators { separators } => Some(separators),
            RawSpec::List(list) => Some(list),
            // A JSON string may itself carry an array or comma list.
            RawSpec::Text(text) => parse_list_text(&text),
        };
    }
    parse_list_text(raw)
}

/// Parse `"[5,10]"` or `"5, 10"` style text into boundary values.
fn parse_list_text(text: &str) -> Option<Vec<i64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<i64>>(trimmed).ok();
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<i64>().ok())
        .collect()
}
