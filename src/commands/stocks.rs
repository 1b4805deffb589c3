// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cost_basis::{import_trades, load_trades_csv, money, year_report};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("import", sub)) => {
            let path = sub.get_one::<PathBuf>("path").context("--path is required")?;
            let trades = load_trades_csv(path)?;
            let read = trades.len();
            let added = import_trades(conn, trades)?;
            println!("Read {} trades, {} new.", read, added);
        }
        Some(("report", sub)) => {
            let year = *sub.get_one::<i32>("year").context("--year is required")?;
            let report = year_report(conn, year)?;
            if maybe_print_json(sub.get_flag("json"), &report)? {
                return Ok(());
            }
            let rows = report
                .iter()
                .map(|r| {
                    vec![
                        r.ticker.clone(),
                        r.previous.current_quantity.to_string(),
                        money(r.previous.current_position),
                        r.current.current_quantity.to_string(),
                        money(r.current.current_position),
                        money(r.current.profit),
                        r.report_msg.clone(),
                    ]
                })
                .collect();
            let prev_qty = format!("Qty {}", year - 1);
            let prev_pos = format!("Position {}", year - 1);
            let qty = format!("Qty {}", year);
            let pos = format!("Position {}", year);
            let profit = format!("Profit {}", year);
            println!(
                "{}",
                pretty_table(
                    &["Ticker", &prev_qty, &prev_pos, &qty, &pos, &profit, "Message"],
                    rows
                )
            );
        }
        _ => {}
    }
    Ok(())
}
