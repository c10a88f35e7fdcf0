// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Thread-safe in-memory store implementation for the bundled server and tests.

use crate::{
    board::Message,
    ledger::TokenLedgerEntry,
    store::{CasOutcome, LedgerStore, MessageStore, StoreFuture, UserDirectory},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process store backing all three repository traits.
///
/// Each operation takes the relevant lock for its full read-modify-write,
/// so the compare-and-swap contract holds without further coordination.
#[derive(Clone, Default)]
pub struct MemoryStore {
    ledgers: Arc<RwLock<HashMap<String, TokenLedgerEntry>>>,
    messages: Arc<RwLock<Vec<Message>>>,
    users: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose identity directory contains the given usernames.
    pub fn with_users<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = usernames.into_iter().map(Into::into).collect();
        Self {
            users: Arc::new(RwLock::new(set)),
            ..Self::default()
        }
    }
}

impl LedgerStore for MemoryStore {
    fn fetch<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<TokenLedgerEntry>> {
        let ledgers = self.ledgers.clone();

        Box::pin(async move { Ok(ledgers.read().await.get(username).cloned()) })
    }

    fn insert_if_absent(&self, entry: TokenLedgerEntry) -> StoreFuture<'_, TokenLedgerEntry> {
        let ledgers = self.ledgers.clone();

        Box::pin(async move {
            let mut guard = ledgers.write().await;
            let stored = guard
                .entry(entry.username.clone())
                .or_insert(entry)
                .clone();
            Ok(stored)
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        expected: &'a TokenLedgerEntry,
        replacement: TokenLedgerEntry,
    ) -> StoreFuture<'a, CasOutcome> {
        let ledgers = self.ledgers.clone();

        Box::pin(async move {
            let mut guard = ledgers.write().await;
            let outcome = match guard.get(&expected.username) {
                Some(current)
                    if current.tokens == expected.tokens
                        && current.last_reset == expected.last_reset =>
                {
                    CasOutcome::Updated
                }
                Some(_) => CasOutcome::VersionMismatch,
                None => CasOutcome::Missing,
            };

            if matches!(outcome, CasOutcome::Updated) {
                guard.insert(expected.username.clone(), replacement);
            }

            Ok(outcome)
        })
    }
}

impl MessageStore for MemoryStore {
    fn append(&self, message: Message) -> StoreFuture<'_, ()> {
        let messages = self.messages.clone();

        Box::pin(async move {
            messages.write().await.push(message);
            Ok(())
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Message>> {
        let messages = self.messages.clone();

        Box::pin(async move {
            let mut out = messages.read().await.clone();
            // Stable sort keeps insertion order for equal timestamps.
            out.sort_by_key(|m| m.created_at);
            Ok(out)
        })
    }
}

impl UserDirectory for MemoryStore {
    fn contains<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool> {
        let users = self.users.clone();

        Box::pin(async move { Ok(users.read().await.contains(username)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(username: &str, tokens: u32) -> TokenLedgerEntry {
        TokenLedgerEntry {
            username: username.to_string(),
            tokens,
            last_reset: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_the_first_entry() {
        let store = MemoryStore::new();

        let first = store.insert_if_absent(entry("alice", 1)).await.unwrap();
        let second = store.insert_if_absent(entry("alice", 99)).await.unwrap();

        assert_eq!(first.tokens, 1);
        assert_eq!(second.tokens, 1, "second insert must observe the winner");
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_versions() {
        let store = MemoryStore::new();
        let stored = store.insert_if_absent(entry("bob", 2)).await.unwrap();

        let mut replacement = stored.clone();
        replacement.tokens = 1;
        let outcome = store.compare_and_swap(&stored, replacement).await.unwrap();
        assert_eq!(outcome, CasOutcome::Updated);

        // The original version is now stale.
        let mut again = stored.clone();
        again.tokens = 0;
        let outcome = store.compare_and_swap(&stored, again).await.unwrap();
        assert_eq!(outcome, CasOutcome::VersionMismatch);
    }

    #[tokio::test]
    async fn compare_and_swap_reports_missing_entries() {
        let store = MemoryStore::new();
        let ghost = entry("nobody", 1);

        let outcome = store
            .compare_and_swap(&ghost, ghost.clone())
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Missing);
    }

    #[tokio::test]
    async fn directory_contains_seeded_users() {
        let store = MemoryStore::with_users(["alice", "bob"]);

        assert!(store.contains("alice").await.unwrap());
        assert!(!store.contains("mallory").await.unwrap());
    }
}
