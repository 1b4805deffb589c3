// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Daily quote providers. Each returns a uniform `(date, value)` series.

use crate::models::Quote;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::blocking::Client;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_START: (i32, u32, u32) = (2020, 1, 1);

pub trait QuoteProvider {
    fn name(&self) -> &'static str;

    fn fetch(
        &self,
        client: &Client,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>>;
}

pub fn provider_by_name(name: &str) -> Option<Box<dyn QuoteProvider>> {
    match name.trim().to_lowercase().as_str() {
        "binance" => Some(Box::new(BinanceKlines)),
        "awesome" => Some(Box::new(AwesomeApi)),
        "yahoo" | "yfinance" => Some(Box::new(YahooChart)),
        _ => None,
    }
}

fn day_start_millis(d: NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

fn date_from_secs(secs: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// Daily candles from the Binance spot API; the close is the quote.
pub struct BinanceKlines;

impl QuoteProvider for BinanceKlines {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn fetch(&self, client: &Client, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Quote>> {
        let start_ms = day_start_millis(start).to_string();
        let end_ms = day_start_millis(end).to_string();
        let resp = client
            .get("https://api.binance.com/api/v3/klines")
            .query(&[
                ("symbol", symbol.to_uppercase().as_str()),
                ("interval", "1d"),
                ("startTime", start_ms.as_str()),
                ("endTime", end_ms.as_str()),
                ("limit", "1000"),
            ])
            .send()?
            .error_for_status()?;
        let body: serde_json::Value = resp.json()?;
        parse_binance_klines(&body)
    }
}

pub fn parse_binance_klines(body: &serde_json::Value) -> Result<Vec<Quote>> {
    let rows = body
        .as_array()
        .ok_or_else(|| anyhow!("Unexpected klines payload: {}", body))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let open_ms = row
            .get(0)
            .and_then(|v| v.as_i64())
            .context("kline missing open time")?;
        let close = row
            .get(4)
            .and_then(|v| v.as_str())
            .context("kline missing close price")?;
        let date = date_from_secs(open_ms / 1000)
            .with_context(|| format!("Invalid kline open time {}", open_ms))?;
        let value = Decimal::from_str(close)
            .with_context(|| format!("Invalid kline close '{}'", close))?;
        out.push(Quote { date, value });
    }
    Ok(out)
}

/// Currency bids from AwesomeAPI (economia.awesomeapi.com.br).
pub struct AwesomeApi;

#[derive(Debug, Deserialize)]
struct AwesomeDaily {
    bid: Option<String>,
    timestamp: Option<String>,
}

impl QuoteProvider for AwesomeApi {
    fn name(&self) -> &'static str {
        "awesome"
    }

    fn fetch(&self, client: &Client, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Quote>> {
        let num_days = (end - start).num_days().max(1);
        let url = format!(
            "https://economia.awesomeapi.com.br/json/daily/{}/{}/?start_date={}&end_date={}",
            symbol,
            num_days,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        );
        let resp = client.get(url).send()?.error_for_status()?;
        let body = resp.text()?;
        parse_awesome_daily(&body)
    }
}

pub fn parse_awesome_daily(body: &str) -> Result<Vec<Quote>> {
    let rows: Vec<AwesomeDaily> =
        serde_json::from_str(body).context("Unexpected AwesomeAPI payload")?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(bid), Some(ts)) = (row.bid, row.timestamp) else {
            warn!("AwesomeAPI row without bid/timestamp skipped");
            continue;
        };
        let secs: i64 = ts
            .trim()
            .parse()
            .with_context(|| format!("Invalid AwesomeAPI timestamp '{}'", ts))?;
        let date = date_from_secs(secs)
            .with_context(|| format!("Invalid AwesomeAPI timestamp '{}'", ts))?;
        let value = Decimal::from_str(bid.trim())
            .with_context(|| format!("Invalid AwesomeAPI bid '{}'", bid))?;
        out.push(Quote { date, value });
    }
    out.sort_by_key(|q| q.date);
    Ok(out)
}

/// Daily closes from the Yahoo Finance chart endpoint.
pub struct YahooChart;

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartBody,
}

#[derive(Debug, Deserialize)]
struct YahooChartBody {
    result: Option<Vec<YahooChartResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl QuoteProvider for YahooChart {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch(&self, client: &Client, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Quote>> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            symbol,
            day_start_millis(start) / 1000,
            day_start_millis(end) / 1000
        );
        let resp = client.get(url).send()?.error_for_status()?;
        let body = resp.text()?;
        parse_yahoo_chart(&body)
    }
}

pub fn parse_yahoo_chart(body: &str) -> Result<Vec<Quote>> {
    let parsed: YahooChartResponse =
        serde_json::from_str(body).context("Unexpected Yahoo chart payload")?;
    let Some(result) = parsed.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    let mut out = Vec::new();
    for (ts, close) in result.timestamp.into_iter().zip(closes) {
        let (Some(px), Some(date)) = (close, date_from_secs(ts)) else {
            continue;
        };
        if let Some(value) = Decimal::from_f64_retain(px) {
            out.push(Quote { date, value });
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub symbol: String,
    pub asset: String,
    pub currency: String,
    pub start: Option<NaiveDate>,
}

pub fn last_persisted_date(conn: &Connection, asset: &str, currency: &str) -> Result<Option<NaiveDate>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT MAX(date) FROM quotations WHERE asset=?1 AND currency=?2",
            params![asset, currency],
            |r| r.get(0),
        )
        .optional()?
        .flatten();
    raw.map(|s| crate::utils::parse_date(&s)).transpose()
}

/// First day to request: explicit start, else the day after the last stored quote.
pub fn resolve_start(conn: &Connection, req: &QuoteRequest) -> Result<NaiveDate> {
    if let Some(start) = req.start {
        return Ok(start);
    }
    match last_persisted_date(conn, &req.asset, &req.currency)? {
        Some(last) => Ok(last + Duration::days(1)),
        None => {
            let (y, m, d) = DEFAULT_START;
            let default = NaiveDate::from_ymd_opt(y, m, d).context("Invalid default start date")?;
            info!(asset = %req.asset, currency = %req.currency, %default, "no stored quotes, using default start");
            Ok(default)
        }
    }
}

pub fn upsert_quotes(
    conn: &mut Connection,
    req: &QuoteRequest,
    source: &str,
    quotes: &[Quote],
) -> Result<usize> {
    let processed_at = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO quotations(date, asset, currency, value, source, processed_at)
         VALUES (?1,?2,?3,?4,?5,?6)
         ON CONFLICT(date, asset, currency) DO UPDATE SET
            value=excluded.value, source=excluded.source, processed_at=excluded.processed_at",
    )?;
    for q in quotes {
        insert.execute(params![
            q.date.to_string(),
            req.asset,
            req.currency,
            q.value.to_string(),
            source,
            processed_at
        ])?;
    }
    drop(insert);
    tx.commit()?;
    Ok(quotes.len())
}

pub fn fetch_and_store(
    conn: &mut Connection,
    client: &Client,
    provider: &dyn QuoteProvider,
    req: &QuoteRequest,
    today: NaiveDate,
) -> Result<usize> {
    let start = resolve_start(conn, req)?;
    if start > today {
        info!(asset = %req.asset, %start, "quotes already up to date");
        return Ok(0);
    }
    let quotes = provider
        .fetch(client, &req.symbol, start, today)
        .with_context(|| format!("Fetch {} from {}", req.symbol, provider.name()))?;
    if quotes.is_empty() {
        warn!(symbol = %req.symbol, provider = provider.name(), "no data to persist");
        return Ok(0);
    }
    let stored = upsert_quotes(conn, req, provider.name(), &quotes)?;
    info!(asset = %req.asset, currency = %req.currency, stored, "quotes persisted");
    Ok(stored)
}
