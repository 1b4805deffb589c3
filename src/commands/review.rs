// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::review::{filter_for_review, load_reviewed_keys, mark_reviewed, read_review_csv};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("resolve", sub)) => {
            let key = sub.get_one::<String>("key").context("--key is required")?.trim();
            let note = sub.get_one::<String>("note").map(|s| s.as_str());
            if mark_reviewed(conn, key, note)? {
                println!("Marked {} as reviewed", key);
            } else {
                println!("{} was already reviewed", key);
            }
        }
        Some(("list", sub)) => list_reviewed(conn, sub.get_flag("json"))?,
        Some(("pending", sub)) => {
            let path = sub.get_one::<PathBuf>("path").context("--path is required")?;
            let reviewed = load_reviewed_keys(conn)?;
            let pending = filter_for_review(read_review_csv(path)?, &reviewed, &BTreeSet::new());
            if !maybe_print_json(sub.get_flag("json"), &pending)? {
                let rows = pending
                    .iter()
                    .map(|r| {
                        vec![
                            r.event_key.clone(),
                            r.operation.clone(),
                            r.asset.clone(),
                            r.change.to_string(),
                            r.reason.as_str().to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Key", "Operation", "Coin", "Change", "Reason"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReviewedKey {
    event_key: String,
    note: Option<String>,
    created_at: String,
}

fn list_reviewed(conn: &Connection, json: bool) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT event_key, note, created_at FROM manually_inserted_keys ORDER BY created_at, event_key",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(ReviewedKey {
            event_key: r.get(0)?,
            note: r.get(1)?,
            created_at: r.get(2)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if maybe_print_json(json, &data)? {
        return Ok(());
    }
    let table_rows = data
        .into_iter()
        .map(|k| vec![k.event_key, k.note.unwrap_or_default(), k.created_at])
        .collect();
    println!("{}", pretty_table(&["Key", "Note", "Resolved at"], table_rows));
    Ok(())
}
