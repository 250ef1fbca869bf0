// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact packaging.
//
// Two container modes, both byte-faithful: a multipart/mixed stream whose
// entries can be consumed while later parts are still being emitted, and a
// ZIP archive with sequentially numbered entries for random access.

use std::io::{Cursor, Write};

use tracing::{debug, instrument};
use uuid::Uuid;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use schneidwerk_core::error::{Result, SchneidwerkError};
use schneidwerk_core::types::{Part, part_download_name, part_file_name};

/// Streams an ordered sequence of parts as one `multipart/mixed` body.
///
/// Each instance carries a unique boundary delimiter so responses can never
/// collide with document content from another request.
pub struct MultipartPackager {
    boundary: String,
}

impl MultipartPackager {
    pub fn new() -> Self {
        Self {
            boundary: format!("schneidwerk-{}", Uuid::new_v4().simple()),
        }
    }

    /// The boundary delimiter, without leading dashes.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the response's Content-Type header.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Lazily emit the container as an ordered chunk sequence: for each part
    /// a delimiter-plus-headers chunk, the part bytes, and a line break;
    /// then the closing delimiter.  Consumers may read entry `n` before
    /// entry `n + 1` has been produced.
    pub fn chunks(
        &self,
        stem: &str,
        parts: Vec<Part>,
    ) -> impl Iterator<Item = Vec<u8>> + Send + 'static {
        let boundary = self.boundary.clone();
        let closing = format!("--{boundary}--\r\n").into_bytes();
        let stem = stem.to_string();

        let entries = parts.into_iter().enumerate().flat_map(move |(index, part)| {
            let header = format!(
                "--{boundary}\r\n\
                 Content-Type: application/pdf\r\n\
                 Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
                part_download_name(&stem, index)
            )
            .into_bytes();
            [header, part.bytes, b"\r\n".to_vec()]
        });

        entries.chain(std::iter::once(closing))
    }
}

impl Default for MultipartPackager {
    fn default() -> Self {
        Self::new()
    }
}

/// Packs an ordered sequence of parts into a single ZIP archive.
///
/// Entries are named `part-0001.pdf`, `part-0002.pdf`, ... in part order and
/// stored uncompressed, so extraction reproduces each part byte-for-byte.
pub struct ArchivePackager;

impl ArchivePackager {
    #[instrument(skip_all, fields(parts = parts.len()))]
    pub fn package(parts: &[Part]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (index, part) in parts.iter().enumerate() {
            writer
                .start_file(part_file_name(index), options)
                .map_err(|err| SchneidwerkError::Archive(format!("start entry: {err}")))?;
            writer
                .write_all(&part.bytes)
                .map_err(|err| SchneidwerkError::Archive(format!("write entry: {err}")))?;
        }

        let cursor = writer
            .finish()
            .map_err(|err| SchneidwerkError::Archive(format!("finish archive: {err}")))?;

        let archive = cursor.into_inner();
        debug!(bytes_len = archive.len(), "archive packaged");
        Ok(archive)
    }
}
