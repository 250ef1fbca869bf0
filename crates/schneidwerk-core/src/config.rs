// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.
//
// Constructed once (defaults or environment) and passed by value into each
// component — no global state.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Service settings for the split/validate/repair engine and its HTTP facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum accepted upload size in megabytes.
    pub max_upload_size_mb: u64,
    /// Maximum page count a document may have to be split.
    pub max_pages: u32,
    /// Retention age for published artifacts, in minutes.
    pub temp_retention_min: u64,
    /// Period of the background sweeper, in seconds.
    pub sweep_interval_secs: u64,
    /// Size of the bounded worker pool for CPU-bound document work.
    pub max_workers: usize,
    /// Run each produced part through the structural validator (and repairer
    /// where needed) before packaging.
    pub validate_parts: bool,
    /// PDF versions below this floor produce a compatibility warning.
    pub compatibility_floor: String,
    /// Root directory for staged and published artifacts.
    pub temp_dir: PathBuf,
    /// Bind address for the HTTP facade.
    pub listen_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_upload_size_mb: 100,
            max_pages: 100,
            temp_retention_min: 60,
            sweep_interval_secs: 60,
            max_workers: 2,
            validate_parts: true,
            compatibility_floor: "1.4".into(),
            temp_dir: PathBuf::from("tmp"),
            listen_addr: "0.0.0.0:8080".into(),
        }
    }
}

impl ServiceConfig {
    /// Build a configuration from environment variables, falling back to the
    /// defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_upload_size_mb: env_parse("MAX_UPLOAD_SIZE_MB", defaults.max_upload_size_mb),
            max_pages: env_parse("MAX_PAGES", defaults.max_pages),
            temp_retention_min: env_parse("TEMP_RETENTION_MIN", defaults.temp_retention_min),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            max_workers: env_parse("MAX_WORKERS", defaults.max_workers).max(1),
            validate_parts: env_parse("VALIDATE_PARTS", defaults.validate_parts),
            compatibility_floor: std::env::var("COMPATIBILITY_FLOOR")
                .unwrap_or(defaults.compatibility_floor),
            temp_dir: std::env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
        }
    }

    /// Upload cap in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }

    /// Retention age as a `Duration`.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.temp_retention_min * 60)
    }

    /// Sweeper period as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Parse an environment variable, returning `default` when unset or invalid.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
