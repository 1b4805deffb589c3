// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finsync::config::ReconcileConfig;
use finsync::error::ReconcileError;
use finsync::loader::read_events;
use finsync::models::{RawEvent, ReviewReason};
use finsync::reconcile::{Bucket, ReconciliationResult, Reconciler, check_exhaustive};
use finsync::review::filter_for_review;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

const HEADER: &str = "User_ID,UTC_Time,Account,Operation,Coin,Change,Remark\n";

const STATEMENT: &str = "\
1,2024-01-02 10:00:00,Spot,Transaction Spend,USDT,-100,
1,2024-01-02 10:00:00,Spot,Transaction Buy,BTC,90,
1,2024-01-03 11:00:00,Spot,Transaction Sold,BTC,-0.5,
1,2024-01-03 11:00:00,Spot,Transaction Revenue,USDT,20000,
1,2024-01-03 11:00:00,Spot,Transaction Fee,USDT,-20,
1,2024-01-04 12:00:00,Spot,Transaction Spend,USDT,-10,
1,2024-01-04 12:00:00,Spot,Transaction Buy,ETH,0.01,
1,2024-01-04 12:00:00,Spot,Transaction Spend,USDT,-5,
1,2024-01-04 12:00:00,Spot,Transaction Buy,ETH,0.005,
1,2024-01-05 09:00:00,Spot,Binance Convert,USDT,-50,
1,2024-01-05 09:00:00,Spot,Binance Convert,BNB,0.2,
1,2024-01-06 00:00:00,Earn,Simple Earn Flexible Interest,USDT,0.01,
1,2024-01-06 00:00:00,Earn,Simple Earn Flexible Interest,USDT,0.02,
1,2024-01-06 00:00:00,Earn,Staking Rewards,ETH,0.001,
1,2024-01-07 08:00:00,Spot,Deposit,BRL,500,
1,2024-01-07 09:00:00,Spot,Deposit,USDT,100,
1,2024-01-08 00:00:00,Spot,Airdrop Assets,XYZ,3,
1,2024-01-09 00:00:00,Earn,Simple Earn Flexible Subscription,USDT,-100,
1,2024-01-10 00:00:00,Spot,Withdraw,BTC,-0.1,
1,2024-01-11 00:00:00,Earn,Staking Purchase,ETH,-1,
1,2024-01-12 00:00:00,Spot,Launchpool Interest,BNB,0.3,airdrop-ish
";

fn events(body: &str) -> Vec<RawEvent> {
    let csv = format!("{}{}", HEADER, body);
    read_events(csv.as_bytes(), Path::new("statement.csv")).unwrap()
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn reconcile(body: &str) -> ReconciliationResult {
    Reconciler::new(ReconcileConfig::binance())
        .reconcile(&events(body))
        .unwrap()
}

#[test]
fn two_row_swap_becomes_single_record() {
    let result = reconcile(
        "1,K1,Spot,Transaction Spend,USDT,-100,\n1,K1,Spot,Transaction Buy,BTC,90,\n"
            .replace("K1", "2024-01-02 10:00:00")
            .as_str(),
    );
    assert_eq!(result.swaps.len(), 1);
    let swap = &result.swaps[0];
    assert_eq!(swap.paid_amount, d("100"));
    assert_eq!(swap.received_amount, d("90"));
    assert_eq!(swap.paid_taxes_amount, Decimal::ZERO);
    assert_eq!(swap.paid_taxes_currency, None);
    assert_eq!(swap.paid_currency.as_deref(), Some("USDT"));
    assert_eq!(swap.received_currency, "BTC");

    let by_bucket = result.keys_by_bucket();
    for (bucket, keys) in by_bucket {
        if bucket != Bucket::Swaps {
            assert!(keys.is_empty(), "{} should be empty", bucket.name());
        }
    }
}

#[test]
fn full_statement_is_partitioned() {
    let evs = events(STATEMENT);
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&evs).unwrap();
    check_exhaustive(&evs, &result).unwrap();

    assert_eq!(result.len(Bucket::Swaps), 2);
    assert_eq!(result.len(Bucket::UnresolvedSwaps), 4);
    assert_eq!(result.len(Bucket::Converts), 1);
    assert_eq!(result.len(Bucket::Earnings), 2);
    assert_eq!(result.len(Bucket::FiatDeposits), 1);
    assert_eq!(result.len(Bucket::Airdrops), 1);
    assert_eq!(result.len(Bucket::Subscriptions), 1);
    assert_eq!(result.len(Bucket::Withdrawals), 1);
    assert_eq!(result.len(Bucket::UnresolvedConverts), 0);
    assert_eq!(result.len(Bucket::Conflicting), 0);
    assert_eq!(result.len(Bucket::Remaining), 3);

    let fee_swap = result
        .swaps
        .iter()
        .find(|s| s.event_key == "2024-01-03 11:00:00")
        .unwrap();
    assert_eq!(fee_swap.paid_amount, d("0.5"));
    assert_eq!(fee_swap.paid_taxes_amount, d("20"));
    assert_eq!(fee_swap.paid_taxes_currency.as_deref(), Some("USDT"));

    let convert = &result.converts[0];
    assert_eq!(convert.paid_amount, d("50"));
    assert_eq!(convert.received_currency, "BNB");
    assert_eq!(convert.paid_taxes_amount, Decimal::ZERO);

    let usdt = result.earnings.iter().find(|e| e.currency == "USDT").unwrap();
    assert_eq!(usdt.earning_amount, d("0.03"));
    assert_eq!(usdt.source, "binance_simple_earn");
    let eth = result.earnings.iter().find(|e| e.currency == "ETH").unwrap();
    assert_eq!(eth.source, "binance_staking");

    assert_eq!(result.fiat_deposits[0].value_brl, d("500"));
    assert_eq!(result.airdrops[0].paid_amount, Decimal::ZERO);
    assert_eq!(result.airdrops[0].paid_currency, None);
    assert_eq!(result.swap_table().len(), 4);
}

#[test]
fn four_row_swap_goes_to_manual_review() {
    let result = reconcile(STATEMENT);
    let malformed = "2024-01-04 12:00:00";
    assert!(result.swaps.iter().all(|s| s.event_key != malformed));
    let review = result.manual_review();
    let rows: Vec<_> = review.iter().filter(|r| r.event_key == malformed).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.reason == ReviewReason::UnresolvedSwap));
}

#[test]
fn manual_review_keeps_input_order() {
    let review = reconcile(STATEMENT).manual_review();
    let keys: Vec<&str> = review.iter().map(|r| r.event_key.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(review.last().unwrap().remark.as_deref(), Some("airdrop-ish"));
}

#[test]
fn reconciliation_is_deterministic() {
    let evs = events(STATEMENT);
    let reconciler = Reconciler::new(ReconcileConfig::binance());
    let first = reconciler.reconcile(&evs).unwrap();
    let second = reconciler.reconcile(&evs).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.manual_review(), second.manual_review());
}

#[test]
fn ignore_list_suppresses_review_candidates() {
    let cfg = ReconcileConfig::binance();
    let result = Reconciler::new(cfg.clone()).reconcile(&events(STATEMENT)).unwrap();
    let candidates = result.manual_review();
    assert!(candidates.iter().any(|r| r.operation == "Staking Purchase"));

    let pending = filter_for_review(candidates, &BTreeSet::new(), &cfg.ignored_for_review);
    assert_eq!(pending.len(), 6);
    assert!(pending.iter().all(|r| r.operation != "Staking Purchase"));
    assert!(pending.iter().any(|r| r.operation == "Launchpool Interest"));
}

#[test]
fn reviewed_keys_are_not_reported_again() {
    let result = reconcile(STATEMENT);
    let reviewed: BTreeSet<String> = ["2024-01-04 12:00:00".to_string()].into();
    let pending = filter_for_review(result.manual_review(), &reviewed, &BTreeSet::new());
    assert!(pending.iter().all(|r| r.event_key != "2024-01-04 12:00:00"));
    assert_eq!(pending.len(), 3);
}

#[test]
fn key_claimed_twice_is_routed_to_conflicting() {
    let body = "\
1,2024-02-01 10:00:00,Spot,Transaction Spend,BRL,-100,
1,2024-02-01 10:00:00,Spot,Transaction Buy,BTC,0.001,
1,2024-02-01 10:00:00,Spot,Deposit,BRL,100,
1,2024-02-02 10:00:00,Spot,Deposit,BRL,50,
";
    let evs = events(body);
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&evs).unwrap();
    assert!(result.swaps.is_empty());
    assert_eq!(result.conflicting.len(), 3);
    assert_eq!(result.fiat_deposits.len(), 1);
    assert_eq!(result.fiat_deposits[0].event_key, "2024-02-02 10:00:00");
    assert!(
        result
            .manual_review()
            .iter()
            .all(|r| r.reason == ReviewReason::ConflictingClaims)
    );
    check_exhaustive(&evs, &result).unwrap();
}

#[test]
fn same_sign_convert_is_unresolved() {
    let result = reconcile(
        "1,2024-03-01 10:00:00,Spot,Binance Convert,USDT,5,\n1,2024-03-01 10:00:00,Spot,Binance Convert,BNB,0.1,\n",
    );
    assert!(result.converts.is_empty());
    assert_eq!(result.unresolved_converts.len(), 2);
}

#[test]
fn fiat_currency_comes_from_config() {
    let body = "1,2024-02-02 10:00:00,Spot,Deposit,EUR,50,\n";
    let brl = reconcile(body);
    assert!(brl.fiat_deposits.is_empty());
    assert_eq!(brl.remaining.len(), 1);

    let cfg = ReconcileConfig::binance().with_fiat_currency("eur");
    let eur = Reconciler::new(cfg).reconcile(&events(body)).unwrap();
    assert_eq!(eur.fiat_deposits.len(), 1);
}

#[test]
fn broken_result_fails_integrity_check() {
    let evs = events(STATEMENT);
    let mut result = reconcile(STATEMENT);
    let dropped = result.withdrawals.pop().unwrap();
    let mut duplicate = result.subscriptions[0].clone();
    duplicate.event_key = result.swaps[0].event_key.clone();
    result.remaining.push(duplicate);

    match check_exhaustive(&evs, &result) {
        Err(ReconcileError::Integrity {
            missing,
            unexpected,
            overlapping,
        }) => {
            assert_eq!(missing, vec![dropped.event_key]);
            assert!(unexpected.is_empty());
            assert_eq!(overlapping, vec![result.swaps[0].event_key.clone()]);
        }
        other => panic!("expected integrity error, got {:?}", other),
    }
}

#[test]
fn empty_input_gives_empty_result() {
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&[]).unwrap();
    assert_eq!(result, ReconciliationResult::default());
}

fn assert_routed(body: &str, bucket: Bucket, rows: usize) {
    let evs = events(body);
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&evs).unwrap();
    check_exhaustive(&evs, &result).unwrap();
    assert!(result.swaps.is_empty());
    assert!(result.converts.is_empty());
    assert_eq!(result.len(bucket), rows);
    assert_eq!(result.manual_review().len(), rows);
}

#[test]
fn single_row_swap_is_unresolved() {
    assert_routed(
        "1,2024-03-02 10:00:00,Spot,Transaction Buy,BTC,0.01,\n",
        Bucket::UnresolvedSwaps,
        1,
    );
}

#[test]
fn five_row_swap_is_unresolved() {
    assert_routed(
        "\
1,2024-03-03 10:00:00,Spot,Transaction Spend,USDT,-10,
1,2024-03-03 10:00:00,Spot,Transaction Buy,ETH,0.01,
1,2024-03-03 10:00:00,Spot,Transaction Fee,ETH,-0.0001,
1,2024-03-03 10:00:00,Spot,Transaction Sold,BTC,-0.001,
1,2024-03-03 10:00:00,Spot,Transaction Revenue,USDT,30,
",
        Bucket::UnresolvedSwaps,
        5,
    );
}

#[test]
fn swap_with_positive_spend_is_unresolved() {
    assert_routed(
        "\
1,2024-03-04 10:00:00,Spot,Transaction Spend,USDT,100,
1,2024-03-04 10:00:00,Spot,Transaction Buy,BTC,0.002,
",
        Bucket::UnresolvedSwaps,
        2,
    );
}

#[test]
fn single_row_convert_is_unresolved() {
    assert_routed(
        "1,2024-03-05 10:00:00,Spot,Binance Convert,USDT,-5,\n",
        Bucket::UnresolvedConverts,
        1,
    );
}

#[test]
fn three_row_convert_is_unresolved() {
    assert_routed(
        "\
1,2024-03-06 10:00:00,Spot,Binance Convert,USDT,-5,
1,2024-03-06 10:00:00,Spot,Binance Convert,BNB,0.01,
1,2024-03-06 10:00:00,Spot,Binance Convert,BNB,0.002,
",
        Bucket::UnresolvedConverts,
        3,
    );
}

#[test]
fn unmatched_row_under_swap_key_is_attributed() {
    let body = "\
1,2024-03-07 10:00:00,Spot,Transaction Spend,USDT,-100,
1,2024-03-07 10:00:00,Spot,Transaction Buy,BTC,0.002,
1,2024-03-07 10:00:00,Spot,Small Assets Exchange BNB,BNB,0.0003,
";
    let evs = events(body);
    let result = Reconciler::new(ReconcileConfig::binance()).reconcile(&evs).unwrap();
    check_exhaustive(&evs, &result).unwrap();
    assert_eq!(result.swaps.len(), 1);
    assert!(result.manual_review().is_empty());
    assert_eq!(result.attributed.len(), 1);
    assert_eq!(result.attributed[0].operation, "Small Assets Exchange BNB");
}
