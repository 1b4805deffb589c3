// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{EarningSource, OperationKind, SwapLeg};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Operation labels recognized by each classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLabels {
    pub swap_paid: BTreeSet<String>,
    pub swap_received: BTreeSet<String>,
    pub swap_fee: BTreeSet<String>,
    pub convert: BTreeSet<String>,
    pub staking_reward: BTreeSet<String>,
    pub simple_earn: BTreeSet<String>,
    pub airdrop: BTreeSet<String>,
    pub deposit: BTreeSet<String>,
    pub subscription: BTreeSet<String>,
    pub withdrawal: BTreeSet<String>,
}

impl OperationLabels {
    pub fn kind_of(&self, label: &str) -> OperationKind {
        if self.swap_paid.contains(label) {
            OperationKind::Swap(SwapLeg::Paid)
        } else if self.swap_received.contains(label) {
            OperationKind::Swap(SwapLeg::Received)
        } else if self.swap_fee.contains(label) {
            OperationKind::Swap(SwapLeg::Fee)
        } else if self.convert.contains(label) {
            OperationKind::Convert
        } else if self.staking_reward.contains(label) {
            OperationKind::Earn(EarningSource::Staking)
        } else if self.simple_earn.contains(label) {
            OperationKind::Earn(EarningSource::SimpleEarn)
        } else if self.airdrop.contains(label) {
            OperationKind::Airdrop
        } else if self.deposit.contains(label) {
            OperationKind::Deposit
        } else if self.subscription.contains(label) {
            OperationKind::Subscription
        } else if self.withdrawal.contains(label) {
            OperationKind::Withdrawal
        } else {
            OperationKind::Unrecognized
        }
    }

    /// Labels that appear in more than one rule's set.
    fn shared_labels(&self) -> Vec<String> {
        let sets = [
            &self.swap_paid,
            &self.swap_received,
            &self.swap_fee,
            &self.convert,
            &self.staking_reward,
            &self.simple_earn,
            &self.airdrop,
            &self.deposit,
            &self.subscription,
            &self.withdrawal,
        ];
        let mut seen = BTreeSet::new();
        let mut shared = BTreeSet::new();
        for label in sets.iter().flat_map(|s| s.iter()) {
            if !seen.insert(label) {
                shared.insert(label.clone());
            }
        }
        shared.into_iter().collect()
    }
}

/// Immutable rule set handed to the reconciler. One per exchange export flavour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub exchange_name: String,
    pub fiat_currency: String,
    pub staking_source: String,
    pub simple_earn_source: String,
    pub labels: OperationLabels,
    /// Operation labels that never need a human look, even when unclassified.
    #[serde(default)]
    pub ignored_for_review: BTreeSet<String>,
}

fn set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

impl ReconcileConfig {
    pub fn binance() -> Self {
        ReconcileConfig {
            exchange_name: "binance".into(),
            fiat_currency: "BRL".into(),
            staking_source: "binance_staking".into(),
            simple_earn_source: "binance_simple_earn".into(),
            labels: OperationLabels {
                swap_paid: set(&["Transaction Spend", "Transaction Sold"]),
                swap_received: set(&["Transaction Buy", "Transaction Revenue"]),
                swap_fee: set(&["Transaction Fee"]),
                convert: set(&["Binance Convert"]),
                staking_reward: set(&["Staking Rewards"]),
                simple_earn: set(&[
                    "Simple Earn Flexible Interest",
                    "Simple Earn Locked Rewards",
                ]),
                airdrop: set(&["Airdrop Assets"]),
                deposit: set(&["Deposit"]),
                subscription: set(&["Simple Earn Flexible Subscription"]),
                withdrawal: set(&["Withdraw"]),
            },
            ignored_for_review: set(&[
                "Simple Earn Flexible Redemption",
                "Simple Earn Flexible Airdrop",
                "Staking Purchase",
            ]),
        }
    }

    /// Loads a rule set from JSON and rejects labels claimed by two rules.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Read rule set {}", path.display()))?;
        let cfg: ReconcileConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Parse rule set {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let shared = self.labels.shared_labels();
        if !shared.is_empty() {
            anyhow::bail!(
                "Operation label(s) assigned to more than one rule: {}",
                shared.join(", ")
            );
        }
        if self.fiat_currency.trim().is_empty() {
            anyhow::bail!("fiat_currency must not be empty");
        }
        Ok(())
    }

    pub fn kind_of(&self, label: &str) -> OperationKind {
        self.labels.kind_of(label)
    }

    pub fn source_tag(&self, source: EarningSource) -> &str {
        match source {
            EarningSource::Staking => &self.staking_source,
            EarningSource::SimpleEarn => &self.simple_earn_source,
        }
    }

    pub fn with_fiat_currency(mut self, ccy: &str) -> Self {
        self.fiat_currency = ccy.trim().to_uppercase();
        self
    }

    pub fn with_exchange_name(mut self, name: &str) -> Self {
        self.exchange_name = name.trim().to_string();
        self
    }

    pub fn with_ignored(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.ignored_for_review.extend(labels);
        self
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::binance()
    }
}
