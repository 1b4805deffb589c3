// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

/// Each check yields `(issue, detail)` rows.
const CHECKS: [(&str, &str); 5] = [
    (
        "swap_sign",
        "SELECT event_key || ' ' || received_currency FROM swaps
         WHERE CAST(received_amount AS REAL) < 0 OR CAST(paid_amount AS REAL) < 0
         ORDER BY event_key",
    ),
    (
        "negative_earning",
        "SELECT event_key || ' ' || currency FROM earnings
         WHERE CAST(earning_amount AS REAL) < 0 ORDER BY event_key",
    ),
    (
        "oversold_stock",
        "SELECT date || ' ' || ticker || ' qty=' || current_quantity FROM stock_transactions
         WHERE CAST(current_quantity AS REAL) < 0 ORDER BY ticker, date",
    ),
    (
        "reviewed_key_also_classified",
        "SELECT m.event_key FROM manually_inserted_keys m
         WHERE EXISTS (SELECT 1 FROM swaps s WHERE s.event_key=m.event_key)
            OR EXISTS (SELECT 1 FROM earnings e WHERE e.event_key=m.event_key)
            OR EXISTS (SELECT 1 FROM brl_deposits d WHERE d.event_key=m.event_key)
         ORDER BY m.event_key",
    ),
    (
        "missing_quote",
        "SELECT DISTINCT received_currency FROM swaps s
         WHERE NOT EXISTS (SELECT 1 FROM quotations q WHERE q.asset=s.received_currency)
         ORDER BY received_currency",
    ),
];

pub fn find_issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    for (issue, sql) in CHECKS {
        let mut stmt = conn.prepare(sql)?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let detail: String = r.get(0)?;
            rows.push(vec![issue.to_string(), detail]);
        }
    }
    Ok(rows)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = find_issues(conn)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
