// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finsync::config::ReconcileConfig;
use finsync::db::init_schema;
use finsync::loader::read_events;
use finsync::persist::persist_result;
use finsync::reconcile::Reconciler;
use finsync::review::{load_reviewed_keys, mark_reviewed};
use rusqlite::Connection;
use std::path::Path;

const STATEMENT: &str = "\
User_ID,UTC_Time,Account,Operation,Coin,Change,Remark
1,2024-01-02 10:00:00,Spot,Transaction Spend,USDT,-100,
1,2024-01-02 10:00:00,Spot,Transaction Buy,BTC,90,
1,2024-01-05 09:00:00,Spot,Binance Convert,USDT,-50,
1,2024-01-05 09:00:00,Spot,Binance Convert,BNB,0.2,
1,2024-01-06 00:00:00,Earn,Simple Earn Flexible Interest,USDT,0.01,
1,2024-01-06 00:00:00,Earn,Simple Earn Flexible Interest,USDT,0.02,
1,2024-01-07 08:00:00,Spot,Deposit,BRL,500,
1,2024-01-08 00:00:00,Spot,Airdrop Assets,XYZ,3,
";

fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn persisting_twice_is_idempotent() {
    let mut conn = conn();
    let events = read_events(STATEMENT.as_bytes(), Path::new("s.csv")).unwrap();
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&events).unwrap();

    let first = persist_result(&mut conn, &result).unwrap();
    assert_eq!(first.swaps, 3);
    assert_eq!(first.earnings, 1);
    assert_eq!(first.brl_deposits, 1);
    persist_result(&mut conn, &result).unwrap();

    assert_eq!(count(&conn, "swaps"), 3);
    assert_eq!(count(&conn, "earnings"), 1);
    assert_eq!(count(&conn, "brl_deposits"), 1);

    let earned: String = conn
        .query_row(
            "SELECT earning_amount FROM earnings WHERE currency='USDT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(earned, "0.03");

    let (paid, taxes, taxes_ccy): (String, String, Option<String>) = conn
        .query_row(
            "SELECT paid_amount, paid_taxes_amount, paid_taxes_currency FROM swaps
             WHERE event_key='2024-01-02 10:00:00'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(paid, "100");
    assert_eq!(taxes, "0");
    assert_eq!(taxes_ccy, None);

    let airdrop_paid: Option<String> = conn
        .query_row(
            "SELECT paid_currency FROM swaps WHERE received_currency='XYZ'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(airdrop_paid, None);
}

#[test]
fn reviewed_keys_roundtrip_through_the_table() {
    let conn = conn();
    assert!(mark_reviewed(&conn, "2024-01-04 12:00:00", Some("split order")).unwrap());
    assert!(!mark_reviewed(&conn, "2024-01-04 12:00:00", None).unwrap());
    let keys = load_reviewed_keys(&conn).unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains("2024-01-04 12:00:00"));
}
