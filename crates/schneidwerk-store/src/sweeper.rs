// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background eviction of aged-out artifact groups.
//
// The sweeper runs on its own schedule, decoupled from request traffic.  It
// only ever deletes fully published groups: staging directories and
// directories without a parseable manifest are never touched, so an
// in-flight write can never be raced.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use schneidwerk_core::error::{Result, SchneidwerkError};

use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::store::STAGING_SUFFIX;

/// Remove every published artifact group under `root` whose publish
/// timestamp is older than `max_age`.  Returns the number of groups evicted.
///
/// Per-group failures are logged and skipped; a sweep only fails when the
/// root itself cannot be read or created.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn sweep(root: &Path, max_age: Duration) -> Result<usize> {
    if !root.exists() {
        fs::create_dir_all(root)
            .map_err(|err| SchneidwerkError::Storage(format!("create sweep root: {err}")))?;
        return Ok(0);
    }

    let cutoff = Utc::now()
        - chrono::Duration::from_std(max_age)
            .map_err(|err| SchneidwerkError::Storage(format!("retention out of range: {err}")))?;

    let entries = fs::read_dir(root)
        .map_err(|err| SchneidwerkError::Storage(format!("read sweep root: {err}")))?;

    let mut evicted = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "unreadable directory entry, skipping");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() || is_staging(&path) {
            continue;
        }

        let Some(published_at) = published_at(&path) else {
            // No parseable manifest — treat as unpublished.
            continue;
        };

        if published_at < cutoff {
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!(dir = %path.display(), %published_at, "evicted aged-out artifact group");
                    evicted += 1;
                }
                Err(err) => warn!(dir = %path.display(), %err, "failed to evict artifact group"),
            }
        }
    }

    debug!(evicted, "sweep complete");
    Ok(evicted)
}

fn is_staging(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(STAGING_SUFFIX))
}

/// Publish timestamp recorded in the group's manifest, if any.
fn published_at(dir: &Path) -> Option<chrono::DateTime<Utc>> {
    let bytes = fs::read(dir.join(MANIFEST_FILE)).ok()?;
    let manifest: Manifest = serde_json::from_slice(&bytes).ok()?;
    manifest.published_at
}

/// Periodic sweeper with an explicit start/stop lifecycle.
///
/// Runs as a standalone Tokio task signalled through a [`Notify`] handle,
/// independent of any request's lifetime.
pub struct Sweeper {
    root: PathBuf,
    max_age: Duration,
    period: Duration,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn new(root: impl Into<PathBuf>, max_age: Duration, period: Duration) -> Self {
        Self {
            root: root.into(),
            max_age,
            period,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    /// Spawn the sweep loop.  Calling `start` on a running sweeper is a
    /// no-op.
    pub fn start(&mut self) {
        if self.task_handle.is_some() {
            debug!("sweeper already running");
            return;
        }

        info!(
            root = %self.root.display(),
            max_age_secs = self.max_age.as_secs(),
            period_secs = self.period.as_secs(),
            "starting artifact sweeper"
        );

        let root = self.root.clone();
        let max_age = self.max_age;
        let period = self.period;
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            Self::sweep_loop(root, max_age, period, shutdown).await;
        });
        self.task_handle = Some(handle);
    }

    /// Signal the loop to exit and await its completion.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };

        self.shutdown_signal.notify_one();
        handle
            .await
            .map_err(|err| SchneidwerkError::Worker(format!("sweeper task join: {err}")))?;

        info!("artifact sweeper stopped");
        Ok(())
    }

    /// Whether the sweep loop is currently running.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn sweep_loop(root: PathBuf, max_age: Duration, period: Duration, shutdown: Arc<Notify>) {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; skip it so start() does not race
        // requests that are still staging their very first artifacts.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("sweep loop received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    let sweep_root = root.clone();
                    let outcome = tokio::task::spawn_blocking(move || sweep(&sweep_root, max_age)).await;
                    match outcome {
                        Ok(Ok(evicted)) if evicted > 0 => {
                            info!(evicted, "periodic sweep evicted artifact groups");
                        }
                        Ok(Ok(_)) => {}
                        Ok(Err(err)) => warn!(%err, "periodic sweep failed"),
                        Err(err) => warn!(%err, "sweep task panicked"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TempStore;
    use schneidwerk_core::types::{Part, RequestId};

    fn part(bytes: &[u8]) -> Part {
        Part {
            bytes: bytes.to_vec(),
            start_page: 1,
            end_page: 1,
        }
    }

    /// Publish one artifact group and rewrite its manifest to look
    /// `age` old.
    fn publish_with_age(store: &TempStore, age: Duration) -> PathBuf {
        let id = RequestId::new();
        let staged = store.stage(id, "doc.pdf", &[part(b"bytes")]).expect("stage");
        let guard = store.publish(staged).expect("publish");
        let dir = guard.dir().to_path_buf();
        guard.disarm();

        let manifest_path = dir.join(MANIFEST_FILE);
        let mut manifest: Manifest =
            serde_json::from_slice(&fs::read(&manifest_path).expect("read")).expect("parse");
        manifest.published_at =
            Some(Utc::now() - chrono::Duration::from_std(age).expect("age"));
        fs::write(
            &manifest_path,
            serde_json::to_vec(&manifest).expect("serialize"),
        )
        .expect("write");
        dir
    }

    #[test]
    fn evicts_only_aged_out_published_groups() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = TempStore::new(root.path()).expect("store");
        let max_age = Duration::from_secs(3600);

        let old_dir = publish_with_age(&store, Duration::from_secs(7200));
        let new_dir = publish_with_age(&store, Duration::from_secs(60));

        // A staging group far older than max_age must survive regardless.
        let staged = store
            .stage(RequestId::new(), "inflight.pdf", &[part(b"inflight")])
            .expect("stage");
        let staging_dir = staged.staging_dir().to_path_buf();

        let evicted = sweep(root.path(), max_age).expect("sweep");
        assert_eq!(evicted, 1);
        assert!(!old_dir.exists());
        assert!(new_dir.exists());
        assert!(staging_dir.exists());
    }

    #[test]
    fn directories_without_a_manifest_are_never_evicted() {
        let root = tempfile::tempdir().expect("tempdir");
        let orphan = root.path().join("no-manifest");
        fs::create_dir_all(&orphan).expect("mkdir");

        let evicted = sweep(root.path(), Duration::from_secs(0)).expect("sweep");
        assert_eq!(evicted, 0);
        assert!(orphan.exists());
    }

    #[test]
    fn sweep_creates_a_missing_root() {
        let root = tempfile::tempdir().expect("tempdir");
        let nested = root.path().join("artifacts");
        assert!(!nested.exists());

        let evicted = sweep(&nested, Duration::from_secs(60)).expect("sweep");
        assert_eq!(evicted, 0);
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn sweeper_lifecycle_evicts_in_the_background() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = TempStore::new(root.path()).expect("store");
        let old_dir = publish_with_age(&store, Duration::from_secs(7200));

        let mut sweeper = Sweeper::new(
            root.path(),
            Duration::from_secs(3600),
            Duration::from_millis(20),
        );
        sweeper.start();
        assert!(sweeper.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!old_dir.exists());

        sweeper.stop().await.expect("stop");
        assert!(!sweeper.is_running());
    }
}
