// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Drives the classification rules over one snapshot of raw events and
//! partitions every event key into exactly one output bucket.

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::models::{
    EarningRecord, FiatDeposit, ManualReviewRecord, OperationKind, RawEvent, ReviewReason,
    SwapRecord,
};
use crate::rules;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Swaps,
    Converts,
    Airdrops,
    Earnings,
    FiatDeposits,
    Subscriptions,
    Withdrawals,
    UnresolvedSwaps,
    UnresolvedConverts,
    Conflicting,
    Remaining,
}

impl Bucket {
    pub const ALL: [Bucket; 11] = [
        Bucket::Swaps,
        Bucket::Converts,
        Bucket::Airdrops,
        Bucket::Earnings,
        Bucket::FiatDeposits,
        Bucket::Subscriptions,
        Bucket::Withdrawals,
        Bucket::UnresolvedSwaps,
        Bucket::UnresolvedConverts,
        Bucket::Conflicting,
        Bucket::Remaining,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Swaps => "swaps",
            Bucket::Converts => "converts",
            Bucket::Airdrops => "airdrops",
            Bucket::Earnings => "earnings",
            Bucket::FiatDeposits => "fiat_deposits",
            Bucket::Subscriptions => "subscriptions",
            Bucket::Withdrawals => "withdrawals",
            Bucket::UnresolvedSwaps => "unresolved_swaps",
            Bucket::UnresolvedConverts => "unresolved_converts",
            Bucket::Conflicting => "conflicting",
            Bucket::Remaining => "remaining",
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            Bucket::UnresolvedSwaps
                | Bucket::UnresolvedConverts
                | Bucket::Conflicting
                | Bucket::Remaining
        )
    }
}

/// Output of one reconciliation run. Buckets are pairwise disjoint by event key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub swaps: Vec<SwapRecord>,
    pub converts: Vec<SwapRecord>,
    pub airdrops: Vec<SwapRecord>,
    pub earnings: Vec<EarningRecord>,
    pub fiat_deposits: Vec<FiatDeposit>,
    pub subscriptions: Vec<RawEvent>,
    pub withdrawals: Vec<RawEvent>,
    pub unresolved_swaps: Vec<RawEvent>,
    pub unresolved_converts: Vec<RawEvent>,
    pub conflicting: Vec<RawEvent>,
    pub remaining: Vec<RawEvent>,
    /// Rows under a key claimed by some rule that no rule matched. They
    /// follow their key's bucket and are not a bucket themselves.
    pub attributed: Vec<RawEvent>,
}

fn keys<'a, T>(rows: &'a [T], key: impl Fn(&'a T) -> &'a str) -> BTreeSet<&'a str> {
    rows.iter().map(key).collect()
}

fn swap_key(r: &SwapRecord) -> &str {
    &r.event_key
}

fn raw_key(r: &RawEvent) -> &str {
    &r.event_key
}

impl ReconciliationResult {
    pub fn keys_by_bucket(&self) -> BTreeMap<Bucket, BTreeSet<&str>> {
        let mut out = BTreeMap::new();
        for bucket in Bucket::ALL {
            let set = match bucket {
                Bucket::Swaps => keys(&self.swaps, swap_key),
                Bucket::Converts => keys(&self.converts, swap_key),
                Bucket::Airdrops => keys(&self.airdrops, swap_key),
                Bucket::Earnings => keys(&self.earnings, |r| r.event_key.as_str()),
                Bucket::FiatDeposits => keys(&self.fiat_deposits, |r| r.event_key.as_str()),
                Bucket::Subscriptions => keys(&self.subscriptions, raw_key),
                Bucket::Withdrawals => keys(&self.withdrawals, raw_key),
                Bucket::UnresolvedSwaps => keys(&self.unresolved_swaps, raw_key),
                Bucket::UnresolvedConverts => keys(&self.unresolved_converts, raw_key),
                Bucket::Conflicting => keys(&self.conflicting, raw_key),
                Bucket::Remaining => keys(&self.remaining, raw_key),
            };
            out.insert(bucket, set);
        }
        out
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Swaps => self.swaps.len(),
            Bucket::Converts => self.converts.len(),
            Bucket::Airdrops => self.airdrops.len(),
            Bucket::Earnings => self.earnings.len(),
            Bucket::FiatDeposits => self.fiat_deposits.len(),
            Bucket::Subscriptions => self.subscriptions.len(),
            Bucket::Withdrawals => self.withdrawals.len(),
            Bucket::UnresolvedSwaps => self.unresolved_swaps.len(),
            Bucket::UnresolvedConverts => self.unresolved_converts.len(),
            Bucket::Conflicting => self.conflicting.len(),
            Bucket::Remaining => self.remaining.len(),
        }
    }

    /// Rows destined for the `swaps` table: clean swaps, converts and airdrops.
    pub fn swap_table(&self) -> Vec<SwapRecord> {
        self.swaps
            .iter()
            .chain(&self.converts)
            .chain(&self.airdrops)
            .cloned()
            .collect()
    }

    /// Every manual bucket flattened, in input order, tagged with its reason.
    pub fn manual_review(&self) -> Vec<ManualReviewRecord> {
        let mut rows: Vec<(&RawEvent, ReviewReason)> = Vec::new();
        rows.extend(self.unresolved_swaps.iter().map(|e| (e, ReviewReason::UnresolvedSwap)));
        rows.extend(
            self.unresolved_converts
                .iter()
                .map(|e| (e, ReviewReason::UnresolvedConvert)),
        );
        rows.extend(self.conflicting.iter().map(|e| (e, ReviewReason::ConflictingClaims)));
        rows.extend(self.remaining.iter().map(|e| (e, ReviewReason::Unclassified)));
        rows.sort_by_key(|(e, _)| e.seq);
        rows.into_iter()
            .map(|(e, reason)| ManualReviewRecord::from_event(e, reason))
            .collect()
    }
}

pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Reconciler { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn reconcile(&self, events: &[RawEvent]) -> Result<ReconciliationResult> {
        let cfg = &self.config;
        let swaps = rules::clean_swaps(events, cfg);
        let converts = rules::converts(events, cfg);
        let airdrops = rules::airdrops(events, cfg);
        let earnings = rules::earnings(events, cfg);
        let deposits = rules::fiat_deposits(events, cfg);
        let subscriptions = rules::passthrough(events, cfg, OperationKind::Subscription);
        let withdrawals = rules::passthrough(events, cfg, OperationKind::Withdrawal);

        let unresolved_swap_keys: BTreeSet<&str> = events
            .iter()
            .filter(|e| matches!(cfg.kind_of(&e.operation), OperationKind::Swap(_)))
            .map(|e| e.event_key.as_str())
            .filter(|k| !swaps.claimed.contains(*k))
            .collect();
        let unresolved_convert_keys: BTreeSet<&str> = events
            .iter()
            .filter(|e| cfg.kind_of(&e.operation) == OperationKind::Convert)
            .map(|e| e.event_key.as_str())
            .filter(|k| !converts.claimed.contains(*k))
            .collect();

        let claim_sets: [(Bucket, BTreeSet<&str>); 9] = [
            (Bucket::Swaps, borrowed(&swaps.claimed)),
            (Bucket::Converts, borrowed(&converts.claimed)),
            (Bucket::Airdrops, borrowed(&airdrops.claimed)),
            (Bucket::Earnings, borrowed(&earnings.claimed)),
            (Bucket::FiatDeposits, borrowed(&deposits.claimed)),
            (Bucket::Subscriptions, borrowed(&subscriptions.claimed)),
            (Bucket::Withdrawals, borrowed(&withdrawals.claimed)),
            (Bucket::UnresolvedSwaps, unresolved_swap_keys),
            (Bucket::UnresolvedConverts, unresolved_convert_keys),
        ];

        let mut claimants: BTreeMap<&str, Vec<Bucket>> = BTreeMap::new();
        for (bucket, set) in &claim_sets {
            for key in set {
                claimants.entry(*key).or_default().push(*bucket);
            }
        }
        let conflicting: BTreeSet<&str> = claimants
            .iter()
            .filter(|(_, buckets)| buckets.len() > 1)
            .map(|(key, buckets)| {
                warn!(key = *key, buckets = ?buckets, "key claimed by several rules, routed to manual review");
                *key
            })
            .collect();

        let in_bucket = |bucket: Bucket, key: &str| {
            !conflicting.contains(key)
                && claim_sets
                    .iter()
                    .any(|(b, set)| *b == bucket && set.contains(key))
        };

        let mut result = ReconciliationResult {
            swaps: keep_unconflicted(swaps.records, &conflicting, |r| &r.event_key),
            converts: keep_unconflicted(converts.records, &conflicting, |r| &r.event_key),
            airdrops: keep_unconflicted(airdrops.records, &conflicting, |r| &r.event_key),
            earnings: keep_unconflicted(earnings.records, &conflicting, |r| &r.event_key),
            fiat_deposits: keep_unconflicted(deposits.records, &conflicting, |r| &r.event_key),
            subscriptions: keep_unconflicted(subscriptions.records, &conflicting, |r| &r.event_key),
            withdrawals: keep_unconflicted(withdrawals.records, &conflicting, |r| &r.event_key),
            ..Default::default()
        };

        for ev in events {
            let key = ev.event_key.as_str();
            if conflicting.contains(key) {
                result.conflicting.push(ev.clone());
            } else if in_bucket(Bucket::UnresolvedSwaps, key)
                && matches!(cfg.kind_of(&ev.operation), OperationKind::Swap(_))
            {
                result.unresolved_swaps.push(ev.clone());
            } else if in_bucket(Bucket::UnresolvedConverts, key)
                && cfg.kind_of(&ev.operation) == OperationKind::Convert
            {
                result.unresolved_converts.push(ev.clone());
            } else if !claimants.contains_key(key) {
                result.remaining.push(ev.clone());
            } else if !matched_by_rule(cfg, ev) {
                warn!(
                    key,
                    operation = %ev.operation,
                    asset = %ev.asset,
                    "row matches no rule, attributed to its key's bucket"
                );
                result.attributed.push(ev.clone());
            }
        }

        check_exhaustive(events, &result)?;
        for bucket in Bucket::ALL {
            info!(bucket = bucket.name(), records = result.len(bucket), "bucket ready");
        }
        Ok(result)
    }
}

/// Whether some rule consumed this row itself, not only its key.
fn matched_by_rule(cfg: &ReconcileConfig, ev: &RawEvent) -> bool {
    match cfg.kind_of(&ev.operation) {
        OperationKind::Unrecognized => false,
        OperationKind::Deposit => ev.asset.eq_ignore_ascii_case(&cfg.fiat_currency),
        _ => true,
    }
}

fn borrowed(set: &BTreeSet<String>) -> BTreeSet<&str> {
    set.iter().map(String::as_str).collect()
}

fn keep_unconflicted<T>(
    records: Vec<T>,
    conflicting: &BTreeSet<&str>,
    key: impl Fn(&T) -> &String,
) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| !conflicting.contains(key(r).as_str()))
        .collect()
}

/// Fails unless every input key lands in exactly one bucket and no bucket
/// holds a key absent from the input.
pub fn check_exhaustive(events: &[RawEvent], result: &ReconciliationResult) -> Result<()> {
    let input: BTreeSet<&str> = events.iter().map(|e| e.event_key.as_str()).collect();
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for set in result.keys_by_bucket().values() {
        for key in set {
            *seen.entry(*key).or_default() += 1;
        }
    }
    let missing: Vec<String> = input
        .iter()
        .filter(|k| !seen.contains_key(*k))
        .map(|k| k.to_string())
        .collect();
    let unexpected: Vec<String> = seen
        .keys()
        .filter(|k| !input.contains(*k))
        .map(|k| k.to_string())
        .collect();
    let overlapping: Vec<String> = seen
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(k, _)| k.to_string())
        .collect();
    if missing.is_empty() && unexpected.is_empty() && overlapping.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::Integrity {
            missing,
            unexpected,
            overlapping,
        })
    }
}
