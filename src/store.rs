// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Storage contracts for the message board.
//!
//! The document store, the message store, and the identity store are
//! external collaborators; the service reaches them only through these
//! narrow traits. [`memory::MemoryStore`] is the in-process reference
//! implementation used by the bundled server and the tests.

pub mod memory;

use crate::{board::Message, ledger::TokenLedgerEntry};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Future type returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Error type produced by store implementations.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// Backend-level failure for the storage engine.
    #[error("backend failure: {message}")]
    Backend { message: String },
}

/// Result of a conditional ledger update.
///
/// The ledger's read-modify-write sequence is only safe if the final write
/// lands on the same version it read; anything else is reported and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasOutcome {
    /// The entry matched the expected version and was replaced.
    Updated,
    /// The entry exists but a concurrent writer got there first.
    VersionMismatch,
    /// No entry exists for the username.
    Missing,
}

/// Per-username token ledger storage.
pub trait LedgerStore: Send + Sync {
    /// Fetches the ledger entry for a username, if present.
    fn fetch<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<TokenLedgerEntry>>;

    /// Inserts an entry unless one already exists; returns the entry that
    /// ended up stored (the new one, or the concurrent winner's).
    fn insert_if_absent(&self, entry: TokenLedgerEntry) -> StoreFuture<'_, TokenLedgerEntry>;

    /// Atomically replaces an entry if it still matches the expected version.
    fn compare_and_swap<'a>(
        &'a self,
        expected: &'a TokenLedgerEntry,
        replacement: TokenLedgerEntry,
    ) -> StoreFuture<'a, CasOutcome>;
}

/// Append-only message storage.
pub trait MessageStore: Send + Sync {
    /// Persists a message record.
    fn append(&self, message: Message) -> StoreFuture<'_, ()>;

    /// Returns every message ordered by creation time ascending,
    /// ties broken by insertion order.
    fn list_all(&self) -> StoreFuture<'_, Vec<Message>>;
}

/// The external identity store, reduced to the one question the service asks.
pub trait UserDirectory: Send + Sync {
    /// Whether an account exists for the username.
    fn contains<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool>;
}
