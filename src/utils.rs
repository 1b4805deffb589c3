// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::str::FromStr;

const UA: &str = concat!("finsync/", env!("CARGO_PKG_VERSION"));

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Accepts ISO dates as well as the `dd/mm/YYYY` form used by brokerage notes.
pub fn parse_flexible_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or DD/MM/YYYY", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Parses amounts such as `R$ 1234,56` or `R$1.234,56`.
pub fn parse_brl_amount(s: &str) -> Result<Decimal> {
    let cleaned = s.replace("R$", "");
    let cleaned = cleaned.trim();
    if cleaned.contains(',') {
        parse_decimal(&cleaned.replace('.', "").replace(',', "."))
    } else {
        parse_decimal(cleaned)
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn maybe_print_json<T: serde::Serialize>(json_flag: bool, v: &T) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brl_amounts_accept_symbol_and_decimal_comma() {
        assert_eq!(parse_brl_amount("R$ 12,50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_brl_amount("R$1.234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_brl_amount("7.5").unwrap(), Decimal::new(75, 1));
        assert!(parse_brl_amount("R$ abc").is_err());
    }

    #[test]
    fn flexible_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_flexible_date("09/03/2024").unwrap(), d);
        assert_eq!(parse_flexible_date(" 2024-03-09 ").unwrap(), d);
        assert!(parse_flexible_date("2024/03/09").is_err());
    }

    #[test]
    fn settings_upsert() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        assert_eq!(get_setting(&conn, "fiat_currency").unwrap(), None);
        set_setting(&conn, "fiat_currency", "BRL").unwrap();
        set_setting(&conn, "fiat_currency", "EUR").unwrap();
        assert_eq!(get_setting(&conn, "fiat_currency").unwrap().as_deref(), Some("EUR"));
    }

    #[test]
    fn json_output_only_when_flagged() {
        assert!(!maybe_print_json(false, &vec!["BRL"]).unwrap());
        assert!(maybe_print_json(true, &vec!["BRL"]).unwrap());
    }
}
