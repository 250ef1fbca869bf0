// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The split engine.
//
// Orchestrates one request: normalize → split → per-part validate/repair →
// stage → publish.  Every operation is a stateless transformation over an
// in-memory document; CPU-bound work runs on `spawn_blocking` gated by a
// bounded semaphore so a slow document never starves unrelated requests.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, instrument, warn};

use schneidwerk_core::config::ServiceConfig;
use schneidwerk_core::error::{Result, SchneidwerkError};
use schneidwerk_core::metrics::MetricsSink;
use schneidwerk_core::types::{Part, RequestId, ValidationReport};
use schneidwerk_document::{
    BoundaryOutcome, RepairOutcome, load_or_repair, normalize, repair_bytes, split, validate,
    validate_with_repair,
};
use schneidwerk_store::{ArtifactGuard, TempStore};

/// Everything a completed split produced.
///
/// Dropping the product before `finish()` reclaims the published artifact
/// directory — the guard is armed until the response has been delivered.
pub struct SplitProduct {
    pub request_id: RequestId,
    pub parts: Vec<Part>,
    /// The boundary spec degraded to a single pass-through part.
    pub pass_through: bool,
    /// Source pages processed by the split.
    pub pages_processed: u64,
    guard: ArtifactGuard,
}

impl SplitProduct {
    /// Filesystem location of the published artifact group.
    pub fn artifact_dir(&self) -> &std::path::Path {
        self.guard.dir()
    }

    /// Hand over the cleanup guard, e.g. to tie it to a response stream.
    pub fn into_parts_and_guard(self) -> (Vec<Part>, ArtifactGuard) {
        (self.parts, self.guard)
    }

    /// Mark the response delivered; the artifact now belongs to the sweeper.
    pub fn finish(self) {
        self.guard.disarm();
    }
}

/// The split/validate/repair engine.
pub struct Engine {
    config: ServiceConfig,
    store: TempStore,
    metrics: Arc<dyn MetricsSink>,
    workers: Arc<Semaphore>,
}

impl Engine {
    /// Build an engine over the configured temp root and worker pool.
    pub fn new(config: ServiceConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        let store = TempStore::new(&config.temp_dir)?;
        let workers = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Ok(Self {
            config,
            store,
            metrics,
            workers,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    /// Split `document` at the pages requested by `raw_spec`.
    ///
    /// Never fails for a malformed spec — that degrades to pass-through.
    /// Fails with [`SchneidwerkError::DocumentCorrupt`] only when the
    /// document itself cannot be parsed even after one repair attempt.
    #[instrument(skip_all, fields(bytes_len = document.len(), filename = %original_filename))]
    pub async fn split(
        &self,
        document: Vec<u8>,
        raw_spec: String,
        original_filename: String,
    ) -> Result<SplitProduct> {
        let started = Instant::now();
        let permit = self.acquire_worker().await?;

        let config = self.config.clone();
        let store = self.store.clone();
        let request_id = RequestId::new();

        let product = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_split(
                &config,
                &store,
                request_id,
                document,
                &raw_spec,
                &original_filename,
            )
        })
        .await
        .map_err(|err| SchneidwerkError::Worker(format!("split task join: {err}")))??;

        self.metrics.record_duration("split", started.elapsed());
        self.metrics.incr_pages(product.pages_processed);

        info!(
            request_id = %product.request_id,
            parts = product.parts.len(),
            pass_through = product.pass_through,
            "split complete"
        );
        Ok(product)
    }

    /// Produce a validation report for `document`.
    #[instrument(skip_all, fields(bytes_len = document.len()))]
    pub async fn validate(&self, document: Vec<u8>) -> Result<ValidationReport> {
        let started = Instant::now();
        let permit = self.acquire_worker().await?;
        let floor = self.config.compatibility_floor.clone();

        let report = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            validate(&document, &floor)
        })
        .await
        .map_err(|err| SchneidwerkError::Worker(format!("validate task join: {err}")))?;

        self.metrics.record_duration("validate", started.elapsed());
        self.metrics
            .incr_validation_errors(report.issues.len() as u64);
        Ok(report)
    }

    /// Attempt a structural repair of `document`.
    #[instrument(skip_all, fields(bytes_len = document.len()))]
    pub async fn repair(&self, document: Vec<u8>) -> Result<RepairOutcome> {
        let started = Instant::now();
        let permit = self.acquire_worker().await?;

        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            repair_bytes(&document)
        })
        .await
        .map_err(|err| SchneidwerkError::Worker(format!("repair task join: {err}")))?;

        self.metrics.record_duration("repair", started.elapsed());
        Ok(outcome)
    }

    async fn acquire_worker(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|err| SchneidwerkError::Worker(format!("worker pool closed: {err}")))
    }
}

/// The sequential per-request pipeline, run on a worker thread.
fn run_split(
    config: &ServiceConfig,
    store: &TempStore,
    request_id: RequestId,
    document_bytes: Vec<u8>,
    raw_spec: &str,
    original_filename: &str,
) -> Result<SplitProduct> {
    let (document, repaired) = load_or_repair(document_bytes)?;
    if repaired {
        warn!(request_id = %request_id, "split proceeding on a repaired document");
    }

    let page_count = document.page_count();
    if page_count > config.max_pages {
        return Err(SchneidwerkError::PageLimit {
            pages: page_count,
            limit: config.max_pages,
        });
    }

    let outcome = normalize(raw_spec, page_count);
    let pass_through = outcome == BoundaryOutcome::Trivial;
    let mut parts = split(&document, &outcome)?;

    if config.validate_parts {
        for part in &mut parts {
            heal_part(request_id, part, &config.compatibility_floor);
        }
    }

    let staged = store.stage(request_id, original_filename, &parts)?;
    let guard = store.publish(staged)?;

    Ok(SplitProduct {
        request_id,
        parts,
        pass_through,
        pages_processed: u64::from(page_count),
        guard,
    })
}

/// Validate one produced part and swap in the repaired rewrite when needed.
/// A part that cannot be healed ships as produced — the finding is logged,
/// not fatal.
fn heal_part(request_id: RequestId, part: &mut Part, floor: &str) {
    let (report, healed) = validate_with_repair(&part.bytes, floor);
    match healed {
        Some(document) => {
            debug!(
                request_id = %request_id,
                start_page = part.start_page,
                "produced part was repaired"
            );
            part.bytes = document.into_bytes();
        }
        None if report.repair_successful == Some(false) => {
            warn!(
                request_id = %request_id,
                start_page = part.start_page,
                issues = report.issues.len(),
                "part repair failed, shipping as produced"
            );
        }
        None => {}
    }
}
