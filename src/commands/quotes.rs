// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::quotes::{QuoteRequest, fetch_and_store, provider_by_name};
use crate::utils::{http_client, maybe_print_json, parse_date, pretty_table};
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", sub)) => fetch(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn required<'a>(sub: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    sub.get_one::<String>(name)
        .map(|s| s.trim())
        .with_context(|| format!("--{} is required", name))
}

fn fetch(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let provider_name = required(sub, "provider")?;
    let provider = provider_by_name(provider_name)
        .ok_or_else(|| anyhow!("Unknown quote provider '{}'", provider_name))?;
    let req = QuoteRequest {
        symbol: required(sub, "symbol")?.to_string(),
        asset: required(sub, "asset")?.to_uppercase(),
        currency: required(sub, "currency")?.to_uppercase(),
        start: sub.get_one::<String>("start").map(|s| parse_date(s)).transpose()?,
    };
    let client = http_client()?;
    let today = Utc::now().date_naive();
    let stored = fetch_and_store(conn, &client, provider.as_ref(), &req, today)?;
    println!(
        "{} {}/{} quotes stored from {}.",
        stored,
        req.asset,
        req.currency,
        provider.name()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct QuoteRow {
    date: String,
    asset: String,
    currency: String,
    value: String,
    source: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let asset = sub.get_one::<String>("asset").map(|s| s.trim().to_uppercase());
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50) as i64;
    let mut stmt = conn.prepare(
        "SELECT date, asset, currency, value, source FROM quotations
         WHERE ?1 IS NULL OR asset=?1
         ORDER BY date DESC, asset, currency LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![asset, limit], |r| {
        Ok(QuoteRow {
            date: r.get(0)?,
            asset: r.get(1)?,
            currency: r.get(2)?,
            value: r.get(3)?,
            source: r.get(4)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if maybe_print_json(sub.get_flag("json"), &data)? {
        return Ok(());
    }
    let table_rows = data
        .into_iter()
        .map(|q| vec![q.date, q.asset, q.currency, q.value, q.source])
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Asset", "Currency", "Value", "Source"], table_rows)
    );
    Ok(())
}
