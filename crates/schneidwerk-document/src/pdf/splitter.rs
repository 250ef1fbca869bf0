// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document splitting.
//
// A boundary page starts a new part.  Normalization guarantees every
// boundary lies strictly inside (1, page_count), so every computed range is
// non-empty and the parts partition [1, page_count] exactly.

use lopdf::Document;
use schneidwerk_core::error::{Result, SchneidwerkError};
use schneidwerk_core::types::Part;
use tracing::{debug, info, instrument};

use crate::boundaries::BoundaryOutcome;
use crate::pdf::document::PdfDocument;
use crate::pdf::graph::TargetDocument;

/// Partition `document` according to a normalized boundary outcome.
///
/// `Trivial` yields a single part byte-identical to the input — no
/// re-encoding.  `Valid` boundaries `b1 < ... < bn` yield `n + 1` parts
/// covering `[1, b1-1], [b1, b2-1], ..., [bn, page_count]`.
#[instrument(skip_all, fields(pages = document.page_count()))]
pub fn split(document: &PdfDocument, outcome: &BoundaryOutcome) -> Result<Vec<Part>> {
    let page_count = document.page_count();

    let boundaries = match outcome {
        BoundaryOutcome::Trivial => {
            debug!("trivial boundary spec, returning the document unchanged");
            return Ok(vec![Part {
                bytes: document.bytes().to_vec(),
                start_page: 1,
                end_page: page_count,
            }]);
        }
        BoundaryOutcome::Valid(boundaries) => boundaries,
    };

    info!(?boundaries, page_count, "splitting document");

    let mut parts = Vec::with_capacity(boundaries.len() + 1);
    for (start, end) in ranges(boundaries, page_count) {
        let bytes = extract_range(document, start, end)?;
        parts.push(Part {
            bytes,
            start_page: start,
            end_page: end,
        });
    }

    debug!(parts = parts.len(), "split complete");
    Ok(parts)
}

/// Compute the inclusive page ranges for a validated boundary list.
fn ranges(boundaries: &[u32], page_count: u32) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 1;
    for &boundary in boundaries {
        out.push((start, boundary - 1));
        start = boundary;
    }
    out.push((start, page_count));
    out
}

/// Extract pages `[start, end]` (1-indexed, inclusive) into a fresh
/// standalone document, carrying over string /Info metadata.
fn extract_range(document: &PdfDocument, start: u32, end: u32) -> Result<Vec<u8>> {
    let source: &Document = document.inner();
    let pages = source.get_pages();

    let mut target = TargetDocument::new(&source.version);
    for number in start..=end {
        let page_id = *pages.get(&number).ok_or_else(|| {
            SchneidwerkError::Pdf(format!("page {number} not found during range extraction"))
        })?;
        target.append_page(source, page_id)?;
    }
    target.copy_info_strings(source);
    target.finish()
}
