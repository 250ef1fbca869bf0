// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schneidwerk-document — Document processing for the Schneidwerk split service.
//
// Provides boundary-spec normalization, page-range splitting, structural
// validation, and best-effort repair of PDF documents using the `lopdf` crate.

pub mod boundaries;
pub mod pdf;

// Re-export the primary entry points so callers can use
// `schneidwerk_document::split` etc.
pub use boundaries::{BoundaryOutcome, normalize};
pub use pdf::document::PdfDocument;
pub use pdf::repairer::{RepairOutcome, load_or_repair, repair, repair_bytes};
pub use pdf::splitter::split;
pub use pdf::validator::{validate, validate_with_repair};
