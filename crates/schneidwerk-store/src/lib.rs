// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schneidwerk-store — On-disk lifecycle for produced parts: private staging,
// atomic publish, and a background sweeper that evicts aged-out artifacts.

pub mod manifest;
pub mod store;
pub mod sweeper;

pub use manifest::{Manifest, ManifestEntry};
pub use store::{ArtifactGuard, StagedArtifactSet, TempStore};
pub use sweeper::{Sweeper, sweep};
