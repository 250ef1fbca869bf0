// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Schneidwerk — Core types, configuration, errors, and metrics hooks shared
// across all crates.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

pub use config::ServiceConfig;
pub use error::SchneidwerkError;
pub use metrics::{MetricsSink, NoopMetrics};
pub use types::*;
