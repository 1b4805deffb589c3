// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::ReconcileConfig;
use crate::loader::load_raw_events;
use crate::persist::{PersistSummary, persist_result};
use crate::reconcile::{Bucket, Reconciler};
use crate::review::{filter_for_review, load_reviewed_keys, write_review_csv};
use crate::utils::{get_setting, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("import", sub)) => {
            let report = import(conn, sub)?;
            if !maybe_print_json(sub.get_flag("json"), &report)? {
                print_report(&report);
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub events: usize,
    pub buckets: BTreeMap<Bucket, usize>,
    pub manual_review: usize,
    pub attributed: usize,
    pub persisted: Option<PersistSummary>,
    pub review_file: Option<PathBuf>,
}

/// Rule set precedence: `--rules` file or built-in Binance labels, then stored
/// settings (only without `--rules`), then `--fiat` / `--exchange`.
pub fn resolve_config(conn: &Connection, sub: &clap::ArgMatches) -> Result<ReconcileConfig> {
    let mut cfg = match sub.get_one::<PathBuf>("rules") {
        Some(path) => ReconcileConfig::from_json_file(path)?,
        None => {
            let mut cfg = ReconcileConfig::binance();
            if let Some(fiat) = get_setting(conn, "fiat_currency")? {
                cfg = cfg.with_fiat_currency(&fiat);
            }
            if let Some(name) = get_setting(conn, "exchange_name")? {
                cfg = cfg.with_exchange_name(&name);
            }
            cfg
        }
    };
    if let Some(fiat) = sub.get_one::<String>("fiat") {
        cfg = cfg.with_fiat_currency(fiat);
    }
    if let Some(name) = sub.get_one::<String>("exchange") {
        cfg = cfg.with_exchange_name(name);
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn import(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<ImportReport> {
    let paths: Vec<PathBuf> = sub
        .get_many::<String>("path")
        .context("--path is required")?
        .map(|p| PathBuf::from(p.trim()))
        .collect();
    let cfg = resolve_config(conn, sub)?;
    info!(exchange = %cfg.exchange_name, fiat = %cfg.fiat_currency, files = paths.len(), "starting import");

    let events = load_raw_events(&paths)?;
    let reconciler = Reconciler::new(cfg);
    let result = reconciler.reconcile(&events)?;

    let reviewed = load_reviewed_keys(conn)?;
    let pending = filter_for_review(
        result.manual_review(),
        &reviewed,
        &reconciler.config().ignored_for_review,
    );
    info!(pending = pending.len(), "rows need manual review");

    let persisted = if sub.get_flag("dry-run") {
        info!("dry run, database left untouched");
        None
    } else {
        Some(persist_result(conn, &result)?)
    };

    let review_file = sub.get_one::<PathBuf>("review-out").cloned();
    if let Some(path) = &review_file {
        write_review_csv(path, &pending)?;
    }

    Ok(ImportReport {
        events: events.len(),
        buckets: Bucket::ALL.iter().map(|b| (*b, result.len(*b))).collect(),
        manual_review: pending.len(),
        attributed: result.attributed.len(),
        persisted,
        review_file,
    })
}

fn print_report(report: &ImportReport) {
    let rows = report
        .buckets
        .iter()
        .map(|(bucket, n)| {
            let kind = if bucket.is_manual() { "manual" } else { "classified" };
            vec![bucket.name().to_string(), kind.to_string(), n.to_string()]
        })
        .collect();
    println!("{}", pretty_table(&["Bucket", "Kind", "Records"], rows));
    println!(
        "{} events reconciled, {} rows pending manual review.",
        report.events, report.manual_review
    );
    if report.attributed > 0 {
        println!(
            "{} rows matched no rule and were attributed to their key's bucket.",
            report.attributed
        );
    }
    match &report.persisted {
        Some(p) => println!(
            "Persisted {} swaps, {} earnings, {} fiat deposits.",
            p.swaps, p.earnings, p.brl_deposits
        ),
        None => println!("Dry run: nothing persisted."),
    }
    if let Some(path) = &report.review_file {
        println!("Manual review file: {}", path.display());
    }
}
