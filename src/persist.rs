// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Upserts classified buckets into their tables. Each bucket is written in
//! one transaction, so a failure never leaves a bucket half-written.

use crate::models::{EarningRecord, FiatDeposit, SwapRecord};
use crate::reconcile::ReconciliationResult;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub swaps: usize,
    pub earnings: usize,
    pub brl_deposits: usize,
}

pub fn persist_result(conn: &mut Connection, result: &ReconciliationResult) -> Result<PersistSummary> {
    let processed_at = Utc::now().to_rfc3339();
    let summary = PersistSummary {
        swaps: upsert_swaps(conn, &result.swap_table(), &processed_at)?,
        earnings: upsert_earnings(conn, &result.earnings, &processed_at)?,
        brl_deposits: upsert_fiat_deposits(conn, &result.fiat_deposits, &processed_at)?,
    };
    info!(
        swaps = summary.swaps,
        earnings = summary.earnings,
        brl_deposits = summary.brl_deposits,
        "classified buckets persisted"
    );
    Ok(summary)
}

pub fn upsert_swaps(conn: &mut Connection, rows: &[SwapRecord], processed_at: &str) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO swaps(event_key, date, received_amount, received_currency, paid_amount,
                           paid_taxes_amount, paid_currency, paid_taxes_currency, exchange_name, processed_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
         ON CONFLICT(event_key, received_currency) DO UPDATE SET
            date=excluded.date,
            received_amount=excluded.received_amount,
            paid_amount=excluded.paid_amount,
            paid_taxes_amount=excluded.paid_taxes_amount,
            paid_currency=excluded.paid_currency,
            paid_taxes_currency=excluded.paid_taxes_currency,
            exchange_name=excluded.exchange_name,
            processed_at=excluded.processed_at",
    )?;
    for r in rows {
        insert
            .execute(params![
                r.event_key,
                r.date.to_string(),
                r.received_amount.to_string(),
                r.received_currency,
                r.paid_amount.to_string(),
                r.paid_taxes_amount.to_string(),
                r.paid_currency,
                r.paid_taxes_currency,
                r.exchange_name,
                processed_at
            ])
            .with_context(|| format!("Upsert swap {}", r.event_key))?;
    }
    drop(insert);
    tx.commit()?;
    Ok(rows.len())
}

pub fn upsert_earnings(
    conn: &mut Connection,
    rows: &[EarningRecord],
    processed_at: &str,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO earnings(event_key, date, currency, source, earning_amount, processed_at)
         VALUES (?1,?2,?3,?4,?5,?6)
         ON CONFLICT(event_key, currency, source) DO UPDATE SET
            date=excluded.date,
            earning_amount=excluded.earning_amount,
            processed_at=excluded.processed_at",
    )?;
    for r in rows {
        insert
            .execute(params![
                r.event_key,
                r.date.to_string(),
                r.currency,
                r.source,
                r.earning_amount.to_string(),
                processed_at
            ])
            .with_context(|| format!("Upsert earning {}", r.event_key))?;
    }
    drop(insert);
    tx.commit()?;
    Ok(rows.len())
}

pub fn upsert_fiat_deposits(
    conn: &mut Connection,
    rows: &[FiatDeposit],
    processed_at: &str,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO brl_deposits(event_key, date, value_brl, exchange_name, processed_at)
         VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(event_key) DO UPDATE SET
            date=excluded.date,
            value_brl=excluded.value_brl,
            exchange_name=excluded.exchange_name,
            processed_at=excluded.processed_at",
    )?;
    for r in rows {
        insert
            .execute(params![
                r.event_key,
                r.date.to_string(),
                r.value_brl.to_string(),
                r.exchange_name,
                processed_at
            ])
            .with_context(|| format!("Upsert deposit {}", r.event_key))?;
    }
    drop(insert);
    tx.commit()?;
    Ok(rows.len())
}
