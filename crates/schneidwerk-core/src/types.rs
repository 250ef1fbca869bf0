// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Schneidwerk split service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id for a single split/validate/repair request.
///
/// Also names the request's artifact directory under the temp root, so each
/// request owns an exclusive staging subpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One contiguous page range produced by a split.
///
/// `start_page..=end_page` is 1-indexed and inclusive.  Over a full split
/// result the parts partition `[1, page_count]` without gap or overlap, in
/// ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Serialized PDF bytes of this part.
    pub bytes: Vec<u8>,
    /// First page of the range in the source document (1-indexed).
    pub start_page: u32,
    /// Last page of the range in the source document (inclusive).
    pub end_page: u32,
}

impl Part {
    /// Number of pages covered by this part.
    pub fn page_count(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    /// Size of the serialized part in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Sequentially numbered on-disk / archive entry name for a part
/// (`part-0001.pdf`, `part-0002.pdf`, ...).  `index` is 0-based.
pub fn part_file_name(index: usize) -> String {
    format!("part-{:04}.pdf", index + 1)
}

/// Download filename for a part, derived from the original upload's stem
/// (`report_part1.pdf`, `report_part2.pdf`, ...).  `index` is 0-based.
pub fn part_download_name(stem: &str, index: usize) -> String {
    format!("{}_part{}.pdf", stem, index + 1)
}

/// Result of structural validation of a document.
///
/// `repair_successful` stays `None` unless a repair was actually attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No blocking issues were found.
    pub is_valid: bool,
    /// At least one blocking issue of an auto-fixable class is present.
    pub needs_repair: bool,
    /// Outcome of a repair attempt, if one was made.
    pub repair_successful: Option<bool>,
    /// Blocking findings, in discovery order.
    pub issues: Vec<String>,
    /// Non-blocking compatibility findings, in discovery order.
    pub warnings: Vec<String>,
    /// Derived page count (0 when the page tree is underivable).
    pub page_count: u32,
    /// Size of the document as submitted.
    pub original_size_bytes: u64,
}

impl ValidationReport {
    /// Report for a document that could not be parsed at all.
    pub fn unparsable(size_bytes: u64, issue: String) -> Self {
        Self {
            is_valid: false,
            needs_repair: true,
            repair_successful: None,
            issues: vec![issue],
            warnings: Vec::new(),
            page_count: 0,
            original_size_bytes: size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_page_count_is_inclusive() {
        let part = Part {
            bytes: vec![1, 2, 3],
            start_page: 5,
            end_page: 9,
        };
        assert_eq!(part.page_count(), 5);
        assert_eq!(part.size_bytes(), 3);
    }

    #[test]
    fn file_names_are_sequential_and_padded() {
        assert_eq!(part_file_name(0), "part-0001.pdf");
        assert_eq!(part_file_name(41), "part-0042.pdf");
        assert_eq!(part_download_name("report", 0), "report_part1.pdf");
        assert_eq!(part_download_name("report", 2), "report_part3.pdf");
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
