// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temp-artifact store.
//
// Each request owns an exclusive staging directory `<root>/<id>.staging`,
// invisible to the sweeper.  Publish writes the manifest and renames the
// directory to `<root>/<id>` in one atomic filesystem operation — there is
// no window of partial visibility.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use schneidwerk_core::error::{Result, SchneidwerkError};
use schneidwerk_core::types::{Part, RequestId, part_file_name};

use crate::manifest::{MANIFEST_FILE, Manifest};

/// Suffix marking a directory as unpublished staging space.
pub(crate) const STAGING_SUFFIX: &str = ".staging";

/// Handle on the artifact root directory.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Open (or create) the artifact root.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| SchneidwerkError::Storage(format!("create root: {err}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every part durably into the request's private staging
    /// directory.  Returns once all writes have reached disk.
    #[instrument(skip(self, parts), fields(request_id = %request_id, parts = parts.len()))]
    pub fn stage(
        &self,
        request_id: RequestId,
        original_filename: &str,
        parts: &[Part],
    ) -> Result<StagedArtifactSet> {
        let staging_dir = self.root.join(format!("{request_id}{STAGING_SUFFIX}"));
        let final_dir = self.root.join(request_id.to_string());

        fs::create_dir_all(&staging_dir)
            .map_err(|err| SchneidwerkError::Storage(format!("create staging dir: {err}")))?;

        for (index, part) in parts.iter().enumerate() {
            let path = staging_dir.join(part_file_name(index));
            write_durable(&path, &part.bytes)
                .map_err(|err| SchneidwerkError::Storage(format!("write part: {err}")))?;
        }

        debug!(dir = %staging_dir.display(), "parts staged");
        Ok(StagedArtifactSet {
            staging_dir,
            final_dir,
            manifest: Manifest::for_parts(request_id, original_filename, parts),
        })
    }

    /// Atomically make a staged set visible at its final location.
    ///
    /// The returned guard deletes the published directory on drop unless
    /// disarmed — callers disarm once the response has been fully delivered.
    #[instrument(skip_all, fields(request_id = %staged.manifest.request_id))]
    pub fn publish(&self, mut staged: StagedArtifactSet) -> Result<ArtifactGuard> {
        staged.manifest.published_at = Some(Utc::now());

        let manifest_json = serde_json::to_vec_pretty(&staged.manifest)?;
        write_durable(&staged.staging_dir.join(MANIFEST_FILE), &manifest_json)
            .map_err(|err| SchneidwerkError::Storage(format!("write manifest: {err}")))?;

        if let Err(err) = fs::rename(&staged.staging_dir, &staged.final_dir) {
            // The staging directory is invisible to the sweeper, so it must
            // not be left behind on failure.
            let _ = fs::remove_dir_all(&staged.staging_dir);
            return Err(SchneidwerkError::Storage(format!("publish rename: {err}")));
        }

        info!(dir = %staged.final_dir.display(), "artifact group published");
        Ok(ArtifactGuard {
            dir: staged.final_dir,
            armed: true,
        })
    }
}

/// A staged-but-unpublished artifact group.
#[derive(Debug)]
pub struct StagedArtifactSet {
    staging_dir: PathBuf,
    final_dir: PathBuf,
    manifest: Manifest,
}

impl StagedArtifactSet {
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Delete the staging directory without publishing.
    pub fn discard(self) {
        if let Err(err) = fs::remove_dir_all(&self.staging_dir) {
            warn!(dir = %self.staging_dir.display(), %err, "failed to discard staging dir");
        }
    }
}

/// Deletes a published artifact directory on drop unless disarmed.
///
/// Attached to streaming responses: a consumer disconnecting mid-stream
/// drops the guard, reclaiming the artifact immediately instead of leaving
/// it for the sweeper.
#[derive(Debug)]
pub struct ArtifactGuard {
    dir: PathBuf,
    armed: bool,
}

impl ArtifactGuard {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keep the artifact: the response was fully delivered, eviction is now
    /// the sweeper's job.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(dir = %self.dir.display(), "reclaiming undelivered artifact");
            if let Err(err) = fs::remove_dir_all(&self.dir) {
                warn!(dir = %self.dir.display(), %err, "failed to reclaim artifact dir");
            }
        }
    }
}

/// Write `bytes` to `path` and flush them to disk before returning.
fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
