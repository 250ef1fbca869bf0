// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parsed PDF document wrapper.

use lopdf::Document;
use schneidwerk_core::error::{Result, SchneidwerkError};
use tracing::debug;

/// A successfully parsed PDF document.
///
/// Holds both the original serialized bytes (so pass-through splits stay
/// byte-identical) and the parsed `lopdf` document.  Immutable once built:
/// every operation produces new values.
pub struct PdfDocument {
    /// The document exactly as submitted.
    bytes: Vec<u8>,
    /// The parsed object graph.
    document: Document,
}

impl PdfDocument {
    /// Parse a PDF from raw bytes.
    ///
    /// Fails when the structure cannot be parsed or the page tree yields no
    /// pages — both mean the document is unusable for splitting.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let document = Document::load_mem(&bytes)
            .map_err(|err| SchneidwerkError::Pdf(format!("failed to load PDF from memory: {err}")))?;

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(SchneidwerkError::Pdf(
                "page tree is empty or underivable".into(),
            ));
        }

        debug!(pages = page_count, bytes_len = bytes.len(), "PDF loaded");
        Ok(Self { bytes, document })
    }

    /// Wrap an already-parsed document.  The caller guarantees `document`
    /// was parsed from `bytes` and has a non-empty page tree.
    pub(crate) fn from_parts(bytes: Vec<u8>, document: Document) -> Self {
        Self { bytes, document }
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Size of the serialized document in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The document exactly as submitted.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the wrapper, returning the serialized bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// PDF format version, e.g. `"1.5"`.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// The parsed object graph, for in-crate operations.
    pub(crate) fn inner(&self) -> &Document {
        &self.document
    }
}
