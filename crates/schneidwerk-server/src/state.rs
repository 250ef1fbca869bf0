// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared handler state.

use std::sync::Arc;

use schneidwerk_service::Engine;

use crate::metrics::PrometheusMetrics;

/// State cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub metrics: Arc<PrometheusMetrics>,
}
