// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Instrumentation hooks.
//
// The engine calls these around each operation; the backing implementation
// (Prometheus registry, test counter, nothing at all) is owned by the caller.

use std::time::Duration;

/// Callbacks the engine invokes while processing documents.
pub trait MetricsSink: Send + Sync {
    /// Record the wall-clock duration of one operation
    /// (`"split"`, `"validate"`, or `"repair"`).
    fn record_duration(&self, operation: &'static str, elapsed: Duration);

    /// Count pages processed by a split.
    fn incr_pages(&self, count: u64);

    /// Count blocking validation findings.
    fn incr_validation_errors(&self, count: u64);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_duration(&self, _operation: &'static str, _elapsed: Duration) {}

    fn incr_pages(&self, _count: u64) {}

    fn incr_validation_errors(&self, _count: u64) {}
}
