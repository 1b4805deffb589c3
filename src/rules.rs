// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Classification rules. Every rule sees the full event collection and reports
//! the records it built together with the event keys it claimed; resolving
//! conflicts between rules is the reconciler's job.

use crate::config::ReconcileConfig;
use crate::models::{
    EarningRecord, FiatDeposit, OperationKind, RawEvent, SwapLeg, SwapRecord,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<T> {
    pub records: Vec<T>,
    pub claimed: BTreeSet<String>,
}

impl<T> Default for RuleMatch<T> {
    fn default() -> Self {
        RuleMatch {
            records: Vec::new(),
            claimed: BTreeSet::new(),
        }
    }
}

impl<T> RuleMatch<T> {
    fn push(&mut self, key: &str, record: T) {
        self.claimed.insert(key.to_string());
        self.records.push(record);
    }
}

/// Groups events by key; keys iterate in ascending order, rows keep input order.
pub fn group_by_key<'a, I>(events: I) -> BTreeMap<&'a str, Vec<&'a RawEvent>>
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    let mut groups: BTreeMap<&str, Vec<&RawEvent>> = BTreeMap::new();
    for ev in events {
        groups.entry(ev.event_key.as_str()).or_default().push(ev);
    }
    groups
}

fn is_swap_leg(cfg: &ReconcileConfig, ev: &RawEvent) -> bool {
    matches!(cfg.kind_of(&ev.operation), OperationKind::Swap(_))
}

/// Legs of one swap group, filled in while walking its rows.
#[derive(Default)]
struct SwapPivot<'a> {
    paid: Option<&'a RawEvent>,
    received: Option<&'a RawEvent>,
    fee: Option<&'a RawEvent>,
}

impl<'a> SwapPivot<'a> {
    fn accept(&mut self, leg: SwapLeg, ev: &'a RawEvent) -> bool {
        let slot = match leg {
            SwapLeg::Paid => &mut self.paid,
            SwapLeg::Received => &mut self.received,
            SwapLeg::Fee => &mut self.fee,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(ev);
        true
    }

    fn finish(self, key: &str, exchange: &str) -> Option<SwapRecord> {
        let paid = self.paid?;
        let received = self.received?;
        if paid.change > Decimal::ZERO || received.change < Decimal::ZERO {
            return None;
        }
        if self.fee.is_some_and(|f| f.change > Decimal::ZERO) {
            return None;
        }
        Some(SwapRecord {
            event_key: key.to_string(),
            date: received.date,
            received_amount: received.change,
            received_currency: received.asset.clone(),
            paid_amount: -paid.change,
            paid_currency: Some(paid.asset.clone()),
            paid_taxes_amount: self.fee.map(|f| -f.change).unwrap_or(Decimal::ZERO),
            paid_taxes_currency: self.fee.map(|f| f.asset.clone()),
            exchange_name: exchange.to_string(),
        })
    }
}

fn reduce_swap(cfg: &ReconcileConfig, key: &str, rows: &[&RawEvent]) -> Option<SwapRecord> {
    let mut pivot = SwapPivot::default();
    for ev in rows {
        let OperationKind::Swap(leg) = cfg.kind_of(&ev.operation) else {
            return None;
        };
        if !pivot.accept(leg, *ev) {
            return None;
        }
    }
    pivot.finish(key, &cfg.exchange_name)
}

/// Swaps recorded as 2 or 3 rows with pairwise distinct labels and one paid
/// plus one received leg. Everything else stays unclaimed.
pub fn clean_swaps(events: &[RawEvent], cfg: &ReconcileConfig) -> RuleMatch<SwapRecord> {
    let mut out = RuleMatch::default();
    let groups = group_by_key(events.iter().filter(|ev| is_swap_leg(cfg, ev)));
    for (key, rows) in groups {
        let labels: BTreeSet<&str> = rows.iter().map(|ev| ev.operation.as_str()).collect();
        if labels.len() != rows.len() || !(2..=3).contains(&rows.len()) {
            warn!(key, rows = rows.len(), "swap group is not clean, needs manual review");
            continue;
        }
        match reduce_swap(cfg, key, &rows) {
            Some(record) => out.push(key, record),
            None => warn!(key, labels = ?labels, "swap group has no usable paid/received pair"),
        }
    }
    out
}

/// Two-row conversions: the debit row is the paid side, the other the received side.
pub fn converts(events: &[RawEvent], cfg: &ReconcileConfig) -> RuleMatch<SwapRecord> {
    let mut out = RuleMatch::default();
    let groups = group_by_key(
        events
            .iter()
            .filter(|ev| cfg.kind_of(&ev.operation) == OperationKind::Convert),
    );
    for (key, rows) in groups {
        let [a, b] = rows.as_slice() else {
            warn!(key, rows = rows.len(), "convert group does not have exactly two rows");
            continue;
        };
        let (paid, received) = match (a.change < Decimal::ZERO, b.change < Decimal::ZERO) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => {
                warn!(key, "convert pair has no single debit side");
                continue;
            }
        };
        out.push(
            key,
            SwapRecord {
                event_key: key.to_string(),
                date: received.date,
                received_amount: received.change,
                received_currency: received.asset.clone(),
                paid_amount: -paid.change,
                paid_currency: Some(paid.asset.clone()),
                paid_taxes_amount: Decimal::ZERO,
                paid_taxes_currency: None,
                exchange_name: cfg.exchange_name.clone(),
            },
        );
    }
    out
}

/// Staking and simple-earn rewards, summed per key, currency and source.
pub fn earnings(events: &[RawEvent], cfg: &ReconcileConfig) -> RuleMatch<EarningRecord> {
    let mut sums: BTreeMap<(&str, &str, &str), EarningRecord> = BTreeMap::new();
    for ev in events {
        let OperationKind::Earn(source) = cfg.kind_of(&ev.operation) else {
            continue;
        };
        let tag = cfg.source_tag(source);
        sums.entry((ev.event_key.as_str(), ev.asset.as_str(), tag))
            .and_modify(|rec| rec.earning_amount += ev.change)
            .or_insert_with(|| EarningRecord {
                event_key: ev.event_key.clone(),
                date: ev.date,
                currency: ev.asset.clone(),
                source: tag.to_string(),
                earning_amount: ev.change,
            });
    }
    let mut out = RuleMatch::default();
    for ((key, _, _), record) in sums {
        out.push(key, record);
    }
    out
}

/// Airdropped assets, booked as swaps with nothing paid.
pub fn airdrops(events: &[RawEvent], cfg: &ReconcileConfig) -> RuleMatch<SwapRecord> {
    let mut sums: BTreeMap<(&str, &str), SwapRecord> = BTreeMap::new();
    for ev in events {
        if cfg.kind_of(&ev.operation) != OperationKind::Airdrop {
            continue;
        }
        sums.entry((ev.event_key.as_str(), ev.asset.as_str()))
            .and_modify(|rec| rec.received_amount += ev.change)
            .or_insert_with(|| SwapRecord {
                event_key: ev.event_key.clone(),
                date: ev.date,
                received_amount: ev.change,
                received_currency: ev.asset.clone(),
                paid_amount: Decimal::ZERO,
                paid_currency: None,
                paid_taxes_amount: Decimal::ZERO,
                paid_taxes_currency: None,
                exchange_name: cfg.exchange_name.clone(),
            });
    }
    let mut out = RuleMatch::default();
    for ((key, _), record) in sums {
        out.push(key, record);
    }
    out
}

/// Deposits made in the configured fiat currency.
pub fn fiat_deposits(events: &[RawEvent], cfg: &ReconcileConfig) -> RuleMatch<FiatDeposit> {
    let mut sums: BTreeMap<&str, FiatDeposit> = BTreeMap::new();
    for ev in events {
        if cfg.kind_of(&ev.operation) != OperationKind::Deposit
            || !ev.asset.eq_ignore_ascii_case(&cfg.fiat_currency)
        {
            continue;
        }
        sums.entry(ev.event_key.as_str())
            .and_modify(|rec| rec.value_brl += ev.change)
            .or_insert_with(|| FiatDeposit {
                event_key: ev.event_key.clone(),
                date: ev.date,
                value_brl: ev.change,
                exchange_name: cfg.exchange_name.clone(),
            });
    }
    let mut out = RuleMatch::default();
    for (key, record) in sums {
        out.push(key, record);
    }
    out
}

/// Rows of a single operation kind, kept as they are.
pub fn passthrough(
    events: &[RawEvent],
    cfg: &ReconcileConfig,
    kind: OperationKind,
) -> RuleMatch<RawEvent> {
    let mut out = RuleMatch::default();
    for ev in events {
        if cfg.kind_of(&ev.operation) == kind {
            out.push(&ev.event_key, ev.clone());
        }
    }
    out
}
