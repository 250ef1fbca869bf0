// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact group manifest.
//
// One `manifest.json` per published artifact directory.  The sweeper keys
// eviction off `published_at`; a directory without a parseable manifest is
// treated as unpublished and never evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use schneidwerk_core::types::{Part, RequestId, part_file_name};

/// File name of the manifest inside each artifact directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Record describing one published artifact group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Correlation id of the request that produced this group.
    pub request_id: RequestId,
    /// Filename of the uploaded document.
    pub original_filename: String,
    /// Number of part files in the group.
    pub part_count: u32,
    /// When staging began.
    pub created_at: DateTime<Utc>,
    /// When the group became visible.  Set at publish time.
    pub published_at: Option<DateTime<Utc>>,
    /// Per-part records, in part order.
    pub parts: Vec<ManifestEntry>,
}

/// One part file inside an artifact group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// On-disk file name (`part-0001.pdf`, ...).
    pub file_name: String,
    /// Pages covered by this part.
    pub pages: u32,
    /// SHA-256 of the part bytes, lowercase hex.
    pub sha256: String,
}

impl Manifest {
    /// Build a manifest for freshly staged parts.  `published_at` stays unset
    /// until publish.
    pub fn for_parts(request_id: RequestId, original_filename: &str, parts: &[Part]) -> Self {
        let entries = parts
            .iter()
            .enumerate()
            .map(|(index, part)| ManifestEntry {
                file_name: part_file_name(index),
                pages: part.page_count(),
                sha256: hash_bytes(&part.bytes),
            })
            .collect();

        Self {
            request_id,
            original_filename: original_filename.to_string(),
            part_count: parts.len() as u32,
            created_at: Utc::now(),
            published_at: None,
            parts: entries,
        }
    }
}

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
