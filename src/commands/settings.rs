// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::ReconcileConfig;
use crate::utils::{get_setting, maybe_print_json, pretty_table, set_setting};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;

pub const KEYS: [&str; 2] = ["fiat_currency", "exchange_name"];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").context("--key is required")?;
            let raw = sub.get_one::<String>("value").context("--value is required")?;
            let value = match key.as_str() {
                "fiat_currency" => raw.trim().to_uppercase(),
                _ => raw.trim().to_string(),
            };
            anyhow::ensure!(!value.is_empty(), "{} must not be empty", key);
            set_setting(conn, key, &value)?;
            println!("{} set to {}", key, value);
        }
        Some(("show", sub)) => {
            let effective = effective_settings(conn)?;
            if !maybe_print_json(sub.get_flag("json"), &effective)? {
                let rows = effective
                    .into_iter()
                    .map(|(k, (v, origin))| vec![k.to_string(), v, origin.to_string()])
                    .collect();
                println!("{}", pretty_table(&["Key", "Value", "Origin"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Value of every known setting together with where it comes from.
pub fn effective_settings(conn: &Connection) -> Result<BTreeMap<&'static str, (String, &'static str)>> {
    let defaults = ReconcileConfig::binance();
    let mut out = BTreeMap::new();
    for key in KEYS {
        let entry = match get_setting(conn, key)? {
            Some(v) => (v, "settings"),
            None => {
                let v = match key {
                    "fiat_currency" => defaults.fiat_currency.clone(),
                    _ => defaults.exchange_name.clone(),
                };
                (v, "default")
            }
        };
        out.insert(key, entry);
    }
    Ok(out)
}
