// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Schneidwerk.
//
// Malformed boundary *requests* are never errors — they degrade to a
// pass-through split inside the normalizer.  The variants here cover the
// document's own unusable state and infrastructure failures, which must
// surface to the caller.

use thiserror::Error;

/// Top-level error type for all Schneidwerk operations.
#[derive(Debug, Error)]
pub enum SchneidwerkError {
    // -- Document errors --
    #[error("document is corrupt and could not be repaired: {0}")]
    DocumentCorrupt(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("document has {pages} pages, exceeding the configured limit of {limit}")]
    PageLimit { pages: u32, limit: u32 },

    // -- Packaging --
    #[error("archive packaging failed: {0}")]
    Archive(String),

    // -- Storage / persistence --
    #[error("artifact storage failed: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Worker pool --
    #[error("worker dispatch failed: {0}")]
    Worker(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SchneidwerkError>;
