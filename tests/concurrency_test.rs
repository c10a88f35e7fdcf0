// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Concurrency tests for the token ledger.
//!
//! Racing spends on a single username must never over-spend the allowance:
//! with N tokens on the ledger, exactly N of the concurrent requests may
//! succeed, and the counter must land on zero, never below.

use message_board::{
    config::LedgerConfig,
    ledger::{LedgerError, TokenLedger},
    store::memory::MemoryStore,
};
use std::sync::Arc;

fn contended_ledger(seed_tokens: u32) -> Arc<TokenLedger> {
    let store = Arc::new(MemoryStore::new());
    Arc::new(TokenLedger::new(
        store,
        LedgerConfig {
            seed_tokens,
            // Heavy contention needs more retry headroom than the default.
            max_cas_retries: 64,
            ..LedgerConfig::default()
        },
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_spends_never_overdraw_one_token() {
    let ledger = contended_ledger(1);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.spend("alice").await }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientTokens) => {}
            Err(other) => panic!("unexpected ledger error: {other}"),
        }
    }

    assert_eq!(successes, 1, "only one spend may win the last token");

    let entry = ledger.ensure_current("alice").await.unwrap();
    assert_eq!(entry.tokens, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_spends_consume_exactly_the_seeded_allowance() {
    let ledger = contended_ledger(5);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.spend("bob").await }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientTokens) => {}
            Err(other) => panic!("unexpected ledger error: {other}"),
        }
    }

    assert_eq!(successes, 5);

    let entry = ledger.ensure_current("bob").await.unwrap();
    assert_eq!(entry.tokens, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contention_on_one_user_does_not_starve_another() {
    let ledger = contended_ledger(1);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.spend("noisy").await }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    // The quiet user's seeded token is untouched by the noisy user's race.
    let entry = ledger.spend("quiet").await.unwrap();
    assert_eq!(entry.tokens, 0);
}
