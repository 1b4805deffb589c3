// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::ManualReviewRecord;
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Drops candidates a human already resolved and rows whose operation never
/// needs a look.
pub fn filter_for_review<I>(
    candidates: I,
    already_reviewed: &BTreeSet<String>,
    ignorable_kinds: &BTreeSet<String>,
) -> Vec<ManualReviewRecord>
where
    I: IntoIterator<Item = ManualReviewRecord>,
{
    candidates
        .into_iter()
        .filter(|r| !already_reviewed.contains(&r.event_key))
        .filter(|r| !ignorable_kinds.contains(&r.operation))
        .collect()
}

pub fn load_reviewed_keys(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT event_key FROM manually_inserted_keys")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut keys = BTreeSet::new();
    for row in rows {
        keys.insert(row?);
    }
    Ok(keys)
}

/// Records `key` as manually handled. Returns false when it already was.
pub fn mark_reviewed(conn: &Connection, key: &str, note: Option<&str>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO manually_inserted_keys(event_key, note) VALUES (?1, ?2)",
        params![key, note],
    )?;
    Ok(inserted > 0)
}

pub fn write_review_csv(path: &Path, rows: &[ManualReviewRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Create manual review file {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "manual review file written");
    Ok(())
}

pub fn read_review_csv(path: &Path) -> Result<Vec<ManualReviewRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Open manual review file {}", path.display()))?;
    let mut rows = Vec::new();
    for rec in rdr.deserialize() {
        rows.push(rec.with_context(|| format!("Read {}", path.display()))?);
    }
    Ok(rows)
}
