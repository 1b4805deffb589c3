// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of an exchange export. Rows sharing `event_key` form one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Position in the loaded collection (file order, then row order).
    pub seq: usize,
    pub event_key: String,
    pub date: NaiveDate,
    pub user_id: String,
    pub account: String,
    pub operation: String,
    pub asset: String,
    pub change: Decimal,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapLeg {
    Paid,
    Received,
    Fee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningSource {
    Staking,
    SimpleEarn,
}

/// Recognized operation shapes; labels are mapped onto these by `ReconcileConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Swap(SwapLeg),
    Convert,
    Earn(EarningSource),
    Airdrop,
    Deposit,
    Subscription,
    Withdrawal,
    Unrecognized,
}

/// Row of the `swaps` table. Also used for converts and airdrops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub event_key: String,
    pub date: NaiveDate,
    pub received_amount: Decimal,
    pub received_currency: String,
    pub paid_amount: Decimal,
    pub paid_currency: Option<String>,
    pub paid_taxes_amount: Decimal,
    pub paid_taxes_currency: Option<String>,
    pub exchange_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningRecord {
    pub event_key: String,
    pub date: NaiveDate,
    pub currency: String,
    pub source: String,
    pub earning_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatDeposit {
    pub event_key: String,
    pub date: NaiveDate,
    pub value_brl: Decimal,
    pub exchange_name: String,
}

/// Why a row ended up in manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    UnresolvedSwap,
    UnresolvedConvert,
    ConflictingClaims,
    Unclassified,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::UnresolvedSwap => "unresolved_swap",
            ReviewReason::UnresolvedConvert => "unresolved_convert",
            ReviewReason::ConflictingClaims => "conflicting_claims",
            ReviewReason::Unclassified => "unclassified",
        }
    }
}

/// Raw row flagged for a human, in the layout of the manual inspection file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualReviewRecord {
    #[serde(rename = "UTC_Time")]
    pub event_key: String,
    pub date: NaiveDate,
    #[serde(rename = "User_ID")]
    pub user_id: String,
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Operation")]
    pub operation: String,
    #[serde(rename = "Coin")]
    pub asset: String,
    #[serde(rename = "Change")]
    pub change: Decimal,
    #[serde(rename = "Remark")]
    pub remark: Option<String>,
    pub reason: ReviewReason,
}

impl ManualReviewRecord {
    pub fn from_event(ev: &RawEvent, reason: ReviewReason) -> Self {
        ManualReviewRecord {
            event_key: ev.event_key.clone(),
            date: ev.date,
            user_id: ev.user_id.clone(),
            account: ev.account.clone(),
            operation: ev.operation.clone(),
            asset: ev.asset.clone(),
            change: ev.change,
            remark: ev.remark.clone(),
            reason,
        }
    }
}

/// A daily close/bid value for an asset quoted in `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTrade {
    pub date: NaiveDate,
    pub ticker: String,
    pub quantity: Decimal, // negative for sales
    pub price: Decimal,
    pub taxes: Decimal,
}

/// A trade annotated with the running moving-average state after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    pub trade: StockTrade,
    pub avg_price: Decimal,
    pub current_quantity: Decimal,
}
