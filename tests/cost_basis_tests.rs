// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finsync::cost_basis::{import_trades, load_trades_csv, year_report};
use finsync::db::init_schema;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tempfile::NamedTempFile;

const HEADER: &str = "date,ticker,quantity,price,taxes\n";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn trades_file(rows: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}{}", HEADER, rows).unwrap();
    file.flush().unwrap();
    file
}

fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn
}

const EARLY: &str = "\
02/01/2023,itsa4,100,\"R$ 10,00\",\"R$ 5,00\"
15/06/2023,ITSA4,-40,\"R$ 12,00\",\"R$ 1,00\"
2022-05-05,OLD3,10,1,0
2022-06-05,OLD3,-10,1,0
";

const LATE: &str = "\
10/03/2024,ITSA4,20,\"R$ 11,00\",
20/08/2024,ITSA4,-80,\"R$ 9,00\",\"R$ 2,00\"
";

fn avg_of(conn: &Connection, date: &str) -> (String, String) {
    conn.query_row(
        "SELECT avg_price, current_quantity FROM stock_transactions WHERE ticker='ITSA4' AND date=?1",
        [date],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .unwrap()
}

#[test]
fn csv_accepts_brazilian_dates_and_amounts() {
    let file = trades_file(EARLY);
    let trades = load_trades_csv(file.path()).unwrap();
    assert_eq!(trades.len(), 4);
    assert_eq!(trades[0].ticker, "ITSA4");
    assert_eq!(trades[0].date.to_string(), "2023-01-02");
    assert_eq!(trades[0].price, d("10"));
    assert_eq!(trades[0].taxes, d("5"));
    assert_eq!(trades[1].quantity, d("-40"));
}

#[test]
fn import_continues_from_last_stored_state() {
    let mut conn = conn();
    let early = load_trades_csv(trades_file(EARLY).path()).unwrap();
    assert_eq!(import_trades(&mut conn, early.clone()).unwrap(), 4);
    let late = load_trades_csv(trades_file(LATE).path()).unwrap();
    assert_eq!(import_trades(&mut conn, late.clone()).unwrap(), 2);

    let (avg, qty) = avg_of(&conn, "2024-03-10");
    assert_eq!(d(&avg), d("10.2875"));
    assert_eq!(d(&qty), d("80"));

    // importing the same trades again changes nothing
    let mut all = early;
    all.extend(late);
    assert_eq!(import_trades(&mut conn, all).unwrap(), 0);
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM stock_transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 6);
}

#[test]
fn older_trade_rebuilds_the_ledger() {
    let mut conn = conn();
    let late = load_trades_csv(trades_file(LATE).path()).unwrap();
    import_trades(&mut conn, late).unwrap();
    let early = load_trades_csv(trades_file(EARLY).path()).unwrap();
    import_trades(&mut conn, early).unwrap();

    let (avg, qty) = avg_of(&conn, "2024-03-10");
    assert_eq!(d(&avg), d("10.2875"));
    assert_eq!(d(&qty), d("80"));
    let (_, last_qty) = avg_of(&conn, "2024-08-20");
    assert_eq!(d(&last_qty), Decimal::ZERO);
}

#[test]
fn yearly_report_compares_with_previous_year() {
    let mut conn = conn();
    let mut trades = load_trades_csv(trades_file(EARLY).path()).unwrap();
    trades.extend(load_trades_csv(trades_file(LATE).path()).unwrap());
    import_trades(&mut conn, trades).unwrap();

    let report = year_report(&conn, 2023).unwrap();
    assert_eq!(report.len(), 1);
    let row = &report[0];
    assert_eq!(row.ticker, "ITSA4");
    assert_eq!(row.previous.current_position, Decimal::ZERO);
    assert_eq!(row.current.current_quantity, d("60"));
    assert_eq!(row.current.current_position, d("603"));
    assert_eq!(row.current.profit, d("77"));
    assert_eq!(
        row.report_msg,
        "ITSA4 - 60 shares held. Accumulated profit of R$77.00."
    );

    let report = year_report(&conn, 2024).unwrap();
    assert_eq!(report.len(), 1);
    let row = &report[0];
    assert_eq!(row.previous.current_quantity, d("60"));
    assert_eq!(row.current.current_quantity, Decimal::ZERO);
    assert_eq!(row.current.profit, d("-105"));
    assert_eq!(row.report_msg, "ITSA4 - Accumulated loss of -R$105.00.");

    // OLD3 was flat in both years and realized nothing
    assert!(year_report(&conn, 2024).unwrap().iter().all(|r| r.ticker != "OLD3"));
}
