// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Finsync", "finsync"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("finsync.sqlite"))
}

/// Opens the database at `path` (or the platform default) and creates missing tables.
pub fn open_or_init(path: Option<&Path>) -> Result<Connection> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => db_path()?,
    };
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- swaps, converts and airdrops
    CREATE TABLE IF NOT EXISTS swaps(
        event_key TEXT NOT NULL,
        date TEXT NOT NULL,
        received_amount TEXT NOT NULL,
        received_currency TEXT NOT NULL,
        paid_amount TEXT NOT NULL,
        paid_taxes_amount TEXT NOT NULL DEFAULT '0',
        paid_currency TEXT,
        paid_taxes_currency TEXT,
        exchange_name TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY(event_key, received_currency)
    );
    CREATE INDEX IF NOT EXISTS idx_swaps_date ON swaps(date);

    CREATE TABLE IF NOT EXISTS earnings(
        event_key TEXT NOT NULL,
        date TEXT NOT NULL,
        currency TEXT NOT NULL,
        source TEXT NOT NULL,
        earning_amount TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY(event_key, currency, source)
    );

    CREATE TABLE IF NOT EXISTS brl_deposits(
        event_key TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        value_brl TEXT NOT NULL,
        exchange_name TEXT NOT NULL,
        processed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS manually_inserted_keys(
        event_key TEXT PRIMARY KEY,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- daily quotes: 1 asset = value currency
    CREATE TABLE IF NOT EXISTS quotations(
        date TEXT NOT NULL,
        asset TEXT NOT NULL,
        currency TEXT NOT NULL,
        value TEXT NOT NULL,
        source TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY(date, asset, currency)
    );

    CREATE TABLE IF NOT EXISTS stock_transactions(
        date TEXT NOT NULL,
        ticker TEXT NOT NULL,
        quantity TEXT NOT NULL,
        price TEXT NOT NULL,
        taxes TEXT NOT NULL DEFAULT '0',
        avg_price TEXT NOT NULL,
        current_quantity TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY(date, ticker, quantity, price)
    );
    CREATE INDEX IF NOT EXISTS idx_stock_transactions_ticker ON stock_transactions(ticker, date);
    "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_schema_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }
}
