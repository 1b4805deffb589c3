// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions raised while loading or reconciling exchange exports.
///
/// Ambiguous groups are not represented here: they are routed to manual review.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is missing required column(s): {}", path.display(), missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    #[error("{}:{line}: {reason}", path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "reconciliation integrity check failed: missing keys {missing:?}, unexpected keys {unexpected:?}, keys in several buckets {overlapping:?}"
    )]
    Integrity {
        missing: Vec<String>,
        unexpected: Vec<String>,
        overlapping: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
