// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// schneidwerk-service — The split/validate/repair engine and the packagers
// that serialize ordered parts into multipart streams or ZIP archives.

pub mod engine;
pub mod packager;

pub use engine::{Engine, SplitProduct};
pub use packager::{ArchivePackager, MultipartPackager};
