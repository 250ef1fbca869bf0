// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF operations — parsing, splitting, validation, and repair.

pub mod document;
pub(crate) mod graph;
pub mod repairer;
pub mod splitter;
pub mod validator;
