// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prometheus-backed implementation of the engine's metrics hooks.

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use tracing::warn;

use schneidwerk_core::metrics::MetricsSink;

/// Registry plus the collectors exposed at `/metrics`.
pub struct PrometheusMetrics {
    registry: Registry,
    split_duration_seconds: Histogram,
    validate_duration_seconds: Histogram,
    repair_duration_seconds: Histogram,
    split_pages_total: IntCounter,
    validation_errors_total: IntCounter,
}

impl PrometheusMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let split_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "split_duration_seconds",
            "Time taken for PDF split requests",
        ))?;
        let validate_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "validate_duration_seconds",
            "Time taken for PDF validation requests",
        ))?;
        let repair_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "repair_duration_seconds",
            "Time taken for PDF repair requests",
        ))?;
        let split_pages_total = IntCounter::new(
            "split_pages_total",
            "Total number of pages split",
        )?;
        let validation_errors_total = IntCounter::new(
            "validation_errors_total",
            "Total number of blocking validation findings",
        )?;

        registry.register(Box::new(split_duration_seconds.clone()))?;
        registry.register(Box::new(validate_duration_seconds.clone()))?;
        registry.register(Box::new(repair_duration_seconds.clone()))?;
        registry.register(Box::new(split_pages_total.clone()))?;
        registry.register(Box::new(validation_errors_total.clone()))?;

        Ok(Self {
            registry,
            split_duration_seconds,
            validate_duration_seconds,
            repair_duration_seconds,
            split_pages_total,
            validation_errors_total,
        })
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(%err, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl MetricsSink for PrometheusMetrics {
    fn record_duration(&self, operation: &'static str, elapsed: Duration) {
        let histogram = match operation {
            "split" => &self.split_duration_seconds,
            "validate" => &self.validate_duration_seconds,
            "repair" => &self.repair_duration_seconds,
            _ => return,
        };
        histogram.observe(elapsed.as_secs_f64());
    }

    fn incr_pages(&self, count: u64) {
        self.split_pages_total.inc_by(count);
    }

    fn incr_validation_errors(&self, count: u64) {
        self.validation_errors_total.inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_collectors() {
        let metrics = PrometheusMetrics::new().expect("metrics");
        metrics.record_duration("split", Duration::from_millis(25));
        metrics.incr_pages(12);
        metrics.incr_validation_errors(1);

        let text = metrics.render();
        assert!(text.contains("split_duration_seconds"));
        assert!(text.contains("split_pages_total 12"));
        assert!(text.contains("validation_errors_total 1"));
    }

    #[test]
    fn unknown_operations_are_ignored() {
        let metrics = PrometheusMetrics::new().expect("metrics");
        metrics.record_duration("compact", Duration::from_millis(5));
        assert!(!metrics.render().contains("compact"));
    }
}
