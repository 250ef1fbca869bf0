// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural validation.
//
// Blocking issues make a document invalid for downstream use; warnings flag
// version/feature mismatches with the target consumer.  Every blocking class
// reported here is one the repairer's object-scan rebuild can address, so
// `needs_repair` tracks the presence of blocking issues.

use lopdf::{Document, Object};
use schneidwerk_core::types::ValidationReport;
use tracing::{debug, instrument};

use crate::pdf::document::PdfDocument;
use crate::pdf::repairer::{RepairOutcome, repair_bytes};

/// Inspect `bytes` and produce a validation report.  Never fails: an
/// unparsable document is itself a (blocking) finding.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn validate(bytes: &[u8], compatibility_floor: &str) -> ValidationReport {
    let size_bytes = bytes.len() as u64;

    let document = match Document::load_mem(bytes) {
        Ok(document) => document,
        Err(err) => {
            debug!(%err, "document failed to parse");
            return ValidationReport::unparsable(
                size_bytes,
                format!("document structure could not be parsed: {err}"),
            );
        }
    };

    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    // Page tree and object graph reachability from the root.
    match document.catalog() {
        Ok(catalog) => {
            if catalog
                .get(b"Pages")
                .and_then(|pages| pages.as_reference())
                .is_err()
            {
                issues.push("catalog has no resolvable /Pages reference".to_string());
            }
        }
        Err(err) => issues.push(format!("document catalog is missing or unreadable: {err}")),
    }

    let pages = document.get_pages();
    let page_count = pages.len() as u32;
    if pages.is_empty() {
        issues.push("page tree is empty or underivable".to_string());
    }
    for (number, page_id) in &pages {
        match document.get_object(*page_id) {
            Ok(Object::Dictionary(_)) => {}
            Ok(_) => issues.push(format!("page {number} object is not a dictionary")),
            Err(err) => issues.push(format!("page {number} is unreachable: {err}")),
        }
    }

    // Format version below the configured floor.
    if version_below(&document.version, compatibility_floor) {
        warnings.push(format!(
            "PDF version {} is below the compatibility floor {}",
            document.version, compatibility_floor
        ));
    }

    // Access restrictions.
    if document.trailer.get(b"Encrypt").is_ok() {
        warnings.push("document is encrypted; downstream consumers may reject it".to_string());
    }

    // Linearization and compressed object streams.
    let mut linearized = false;
    let mut object_streams = false;
    for object in document.objects.values() {
        match object {
            Object::Dictionary(dict) if dict.has(b"Linearized") => linearized = true,
            Object::Stream(stream) => match stream.dict.get(b"Type") {
                Ok(Object::Name(name)) if name == b"ObjStm" || name == b"XRef" => {
                    object_streams = true;
                }
                _ => {}
            },
            _ => {}
        }
    }
    if linearized {
        warnings.push("document is linearized; splitting discards fast-web-view hints".to_string());
    }
    if object_streams {
        warnings.push(
            "document uses compressed object streams, which some consumers cannot read".to_string(),
        );
    }

    let is_valid = issues.is_empty();
    debug!(
        is_valid,
        issues = issues.len(),
        warnings = warnings.len(),
        page_count,
        "validation complete"
    );

    ValidationReport {
        is_valid,
        needs_repair: !is_valid,
        repair_successful: None,
        issues,
        warnings,
        page_count,
        original_size_bytes: size_bytes,
    }
}

/// Validate and, when blocking issues are found, attempt the repair rewrite.
///
/// On success the report describes the healed document with
/// `repair_successful = Some(true)` and the rewrite is returned alongside.
/// On failure the original report gains `repair_successful = Some(false)`
/// and the original document stays untouched.
pub fn validate_with_repair(
    bytes: &[u8],
    compatibility_floor: &str,
) -> (ValidationReport, Option<PdfDocument>) {
    let mut report = validate(bytes, compatibility_floor);
    if !report.needs_repair {
        return (report, None);
    }

    match repair_bytes(bytes) {
        RepairOutcome::Repaired(document) => {
            let mut healed = validate(document.bytes(), compatibility_floor);
            healed.repair_successful = Some(true);
            healed.original_size_bytes = bytes.len() as u64;
            (healed, Some(document))
        }
        RepairOutcome::Failed { reason } => {
            debug!(%reason, "repair attempt failed, keeping the original document");
            report.repair_successful = Some(false);
            (report, None)
        }
    }
}

/// Compare dotted PDF versions, e.g. `"1.3" < "1.4"`.
///
/// Unparsable versions never warn.
fn version_below(version: &str, floor: &str) -> bool {
    match (parse_version(version), parse_version(floor)) {
        (Some(version), Some(floor)) => version < floor,
        _ => false,
    }
}

fn parse_version(text: &str) -> Option<(u32, u32)> {
    let (major, minor) = text.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
