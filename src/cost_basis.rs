// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Moving-average cost basis for stock trades and the yearly position/profit report.

use crate::models::{StockPosition, StockTrade};
use crate::utils::{parse_brl_amount, parse_date, parse_decimal, parse_flexible_date};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvgState {
    pub avg_price: Decimal,
    pub quantity: Decimal,
}

impl AvgState {
    /// Buys fold price and taxes into the average; sales only reduce quantity.
    pub fn apply(&mut self, trade: &StockTrade) {
        if trade.quantity > Decimal::ZERO {
            let total_cost =
                self.avg_price * self.quantity + trade.price * trade.quantity + trade.taxes;
            self.quantity += trade.quantity;
            self.avg_price = if self.quantity > Decimal::ZERO {
                total_cost / self.quantity
            } else {
                Decimal::ZERO
            };
        } else {
            self.quantity += trade.quantity;
        }
    }
}

/// Runs trades (already sorted by date, one ticker) on top of a starting state.
pub fn process_new_trades(trades: &[StockTrade], start: AvgState) -> Vec<StockPosition> {
    let mut state = start;
    trades
        .iter()
        .map(|t| {
            state.apply(t);
            StockPosition {
                trade: t.clone(),
                avg_price: state.avg_price,
                current_quantity: state.quantity,
            }
        })
        .collect()
}

/// Full recomputation: trades grouped per ticker and ordered by date.
pub fn calculate_avg_price(mut trades: Vec<StockTrade>) -> Vec<StockPosition> {
    trades.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    let mut out = Vec::with_capacity(trades.len());
    for chunk in trades.chunk_by(|a, b| a.ticker == b.ticker) {
        out.extend(process_new_trades(chunk, AvgState::default()));
    }
    out
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    date: String,
    ticker: String,
    quantity: String,
    price: String,
    #[serde(default)]
    taxes: Option<String>,
}

/// Reads `date,ticker,quantity,price,taxes`; prices may be written as `R$ 10,50`.
pub fn load_trades_csv(path: &Path) -> Result<Vec<StockTrade>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path.display()))?;
    let mut trades = Vec::new();
    for rec in rdr.deserialize() {
        let row: TradeRow = rec?;
        trades.push(StockTrade {
            date: parse_flexible_date(&row.date)?,
            ticker: row.ticker.to_uppercase(),
            quantity: parse_decimal(&row.quantity)
                .with_context(|| format!("Invalid quantity for {}", row.ticker))?,
            price: parse_brl_amount(&row.price)
                .with_context(|| format!("Invalid price for {}", row.ticker))?,
            taxes: match row.taxes.as_deref().filter(|s| !s.is_empty()) {
                Some(raw) => parse_brl_amount(raw)
                    .with_context(|| format!("Invalid taxes for {}", row.ticker))?,
                None => Decimal::ZERO,
            },
        });
    }
    Ok(trades)
}

fn load_positions(conn: &Connection, ticker: Option<&str>) -> Result<Vec<StockPosition>> {
    let mut stmt = conn.prepare(
        "SELECT date, ticker, quantity, price, taxes, avg_price, current_quantity
         FROM stock_transactions
         WHERE ?1 IS NULL OR ticker=?1
         ORDER BY ticker, date, rowid",
    )?;
    let rows = stmt.query_map(params![ticker], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (date_s, ticker, qty_s, price_s, taxes_s, avg_s, cur_s) = row?;
        out.push(StockPosition {
            trade: StockTrade {
                date: parse_date(&date_s)
                    .with_context(|| format!("Invalid stored date for {}", ticker))?,
                quantity: parse_decimal(&qty_s)?,
                price: parse_decimal(&price_s)?,
                taxes: parse_decimal(&taxes_s)?,
                ticker,
            },
            avg_price: parse_decimal(&avg_s)?,
            current_quantity: parse_decimal(&cur_s)?,
        });
    }
    Ok(out)
}

fn trade_pk(t: &StockTrade) -> (NaiveDate, String, Decimal, Decimal) {
    (t.date, t.ticker.clone(), t.quantity.normalize(), t.price.normalize())
}

/// Extends the stored ledger of each ticker with `new_trades`. Trades already
/// stored are skipped. New trades dated on or after the last stored trade
/// continue from its `(avg_price, current_quantity)`; older ones force a
/// rebuild of that ticker's ledger.
pub fn import_trades(conn: &mut Connection, new_trades: Vec<StockTrade>) -> Result<usize> {
    let mut by_ticker: BTreeMap<String, Vec<StockTrade>> = BTreeMap::new();
    for t in new_trades {
        by_ticker.entry(t.ticker.clone()).or_default().push(t);
    }

    let mut positions = Vec::new();
    let mut added = 0usize;
    for (ticker, mut fresh) in by_ticker {
        let stored = load_positions(conn, Some(&ticker))?;
        let mut known: BTreeSet<_> = stored.iter().map(|p| trade_pk(&p.trade)).collect();
        fresh.retain(|t| known.insert(trade_pk(t)));
        if fresh.is_empty() {
            debug!(ticker = %ticker, "no new trades");
            continue;
        }
        fresh.sort_by_key(|t| t.date);
        added += fresh.len();

        let last = stored.last().map(|p| {
            let state = AvgState {
                avg_price: p.avg_price,
                quantity: p.current_quantity,
            };
            (p.trade.date, state)
        });
        match last {
            Some((last_date, _)) if fresh[0].date < last_date => {
                info!(ticker = %ticker, "trade predates stored ledger, rebuilding");
                let mut all: Vec<StockTrade> = stored.into_iter().map(|p| p.trade).collect();
                all.extend(fresh);
                positions.extend(calculate_avg_price(all));
            }
            Some((_, state)) => positions.extend(process_new_trades(&fresh, state)),
            None => positions.extend(process_new_trades(&fresh, AvgState::default())),
        }
    }

    let processed_at = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let mut upsert = tx.prepare_cached(
        "INSERT INTO stock_transactions(date, ticker, quantity, price, taxes, avg_price, current_quantity, processed_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(date, ticker, quantity, price) DO UPDATE SET
            taxes=excluded.taxes,
            avg_price=excluded.avg_price,
            current_quantity=excluded.current_quantity,
            processed_at=excluded.processed_at",
    )?;
    for p in &positions {
        upsert.execute(params![
            p.trade.date.to_string(),
            p.trade.ticker,
            p.trade.quantity.normalize().to_string(),
            p.trade.price.normalize().to_string(),
            p.trade.taxes.to_string(),
            p.avg_price.to_string(),
            p.current_quantity.to_string(),
            processed_at
        ])?;
    }
    drop(upsert);
    tx.commit()?;
    info!(added, ledger_rows = positions.len(), "stock ledger updated");
    Ok(added)
}

/// Year-end state and realized profit of one ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearFigures {
    pub current_quantity: Decimal,
    pub current_position: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearReportRow {
    pub ticker: String,
    pub report_msg: String,
    pub previous: YearFigures,
    pub current: YearFigures,
}

fn year_figures(rows: &[StockPosition], year: i32) -> YearFigures {
    use chrono::Datelike;
    let mut figures = YearFigures::default();
    if let Some(last) = rows.iter().filter(|p| p.trade.date.year() <= year).last() {
        figures.current_quantity = last.current_quantity;
        figures.current_position = last.avg_price * last.current_quantity;
    }
    figures.profit = rows
        .iter()
        .filter(|p| p.trade.date.year() == year && p.trade.quantity < Decimal::ZERO)
        .map(|p| -p.trade.quantity * (p.trade.price - p.avg_price) - p.trade.taxes)
        .sum();
    figures
}

/// Two decimal places, half away from zero.
pub fn money(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn report_message(ticker: &str, current: &YearFigures) -> String {
    let mut msg = format!("{} - ", ticker);
    if current.current_quantity > Decimal::ZERO {
        msg.push_str(&format!("{} shares held. ", current.current_quantity.trunc()));
    }
    if current.profit < Decimal::ZERO {
        msg.push_str(&format!("Accumulated loss of -R${}.", money(-current.profit)));
    } else if current.profit > Decimal::ZERO {
        msg.push_str(&format!("Accumulated profit of R${}.", money(current.profit)));
    }
    msg.trim_end().trim_end_matches(" -").to_string()
}

/// Per-ticker comparison of `year` against the year before. Tickers with no
/// position in either year and no profit are left out.
pub fn year_report(conn: &Connection, year: i32) -> Result<Vec<YearReportRow>> {
    let positions = load_positions(conn, None)?;
    let mut by_ticker: BTreeMap<&str, Vec<StockPosition>> = BTreeMap::new();
    for p in &positions {
        by_ticker.entry(p.trade.ticker.as_str()).or_default().push(p.clone());
    }
    let mut out = Vec::new();
    for (ticker, rows) in by_ticker {
        let previous = year_figures(&rows, year - 1);
        let current = year_figures(&rows, year);
        if previous.current_position.is_zero()
            && current.current_position.is_zero()
            && current.profit.is_zero()
        {
            continue;
        }
        out.push(YearReportRow {
            ticker: ticker.to_string(),
            report_msg: report_message(ticker, &current),
            previous,
            current,
        });
    }
    Ok(out)
}
