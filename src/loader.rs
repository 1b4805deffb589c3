// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Reads exchange transaction exports into one ordered collection of raw events.

use crate::error::{ReconcileError, Result};
use crate::models::RawEvent;
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Required columns, each with the header spellings accepted for it.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("UTC_Time", &["UTC_Time", "id"]),
    ("User_ID", &["User_ID"]),
    ("Account", &["Account"]),
    ("Operation", &["Operation"]),
    ("Coin", &["Coin"]),
    ("Change", &["Change"]),
];

// "User_ID","UTC_Time","Account","Operation","Coin","Change","Remark"
#[derive(Debug, Deserialize)]
struct ExportRow {
    #[serde(rename = "UTC_Time", alias = "id")]
    utc_time: String,
    #[serde(rename = "User_ID")]
    user_id: String,
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Operation")]
    operation: String,
    #[serde(rename = "Coin")]
    coin: String,
    #[serde(rename = "Change")]
    change: String,
    #[serde(rename = "Remark", default)]
    remark: Option<String>,
}

/// Derives the calendar date carried by an event key. A two-digit leading
/// field selects the short-year formats; `%Y` would read it as year 00xx.
pub fn key_date(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    let short_year = key.split('-').next().is_some_and(|y| y.len() == 2);
    let (with_time, date_only) = if short_year {
        ("%y-%m-%d %H:%M:%S", "%y-%m-%d")
    } else {
        ("%Y-%m-%d %H:%M:%S", "%Y-%m-%d")
    };
    NaiveDateTime::parse_from_str(key, with_time)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(key, date_only))
        .ok()
}

fn parse_change(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Loads every file in order and concatenates the rows. No deduplication.
pub fn load_raw_events<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawEvent>> {
    let mut events = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReconcileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let before = events.len();
        read_events_into(file, path, &mut events)?;
        info!(path = %path.display(), rows = events.len() - before, "loaded export file");
    }
    Ok(events)
}

/// Parses one export from any reader, labelling errors with `origin`.
pub fn read_events<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawEvent>> {
    let mut events = Vec::new();
    read_events_into(reader, origin, &mut events)?;
    Ok(events)
}

fn read_events_into<R: Read>(reader: R, origin: &Path, out: &mut Vec<RawEvent>) -> Result<()> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    check_schema(&headers, origin)?;

    for result in rdr.records() {
        let rec = result?;
        let line = rec.position().map(|p| p.line()).unwrap_or_default();
        let row: ExportRow = rec.deserialize(Some(&headers))?;
        out.push(to_event(row, out.len(), origin, line)?);
    }
    debug!(origin = %origin.display(), total = out.len(), "export parsed");
    Ok(())
}

fn check_schema(headers: &StringRecord, origin: &Path) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|(_, accepted)| !headers.iter().any(|h| accepted.contains(&h)))
        .map(|(name, _)| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::Schema {
            path: origin.to_path_buf(),
            missing,
        })
    }
}

fn to_event(row: ExportRow, seq: usize, origin: &Path, line: u64) -> Result<RawEvent> {
    let invalid = |reason: String| ReconcileError::InvalidRow {
        path: PathBuf::from(origin),
        line,
        reason,
    };
    let date = key_date(&row.utc_time)
        .ok_or_else(|| invalid(format!("cannot derive a date from key '{}'", row.utc_time)))?;
    let change = parse_change(&row.change)
        .ok_or_else(|| invalid(format!("invalid amount '{}'", row.change)))?;
    Ok(RawEvent {
        seq,
        event_key: row.utc_time,
        date,
        user_id: row.user_id,
        account: row.account,
        operation: row.operation,
        asset: row.coin,
        change,
        remark: row.remark.filter(|r| !r.is_empty()),
    })
}
