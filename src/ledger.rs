// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-user token ledger gating message posts.
//!
//! Every username owns an allowance counter that is seeded on first contact
//! and replenished lazily: a check that finds the reset interval elapsed
//! grants one batch of tokens and restarts the interval. There is no
//! background sweep. A spend consumes one token; spends never drive the
//! counter negative, even when requests race on the same username.

use crate::{
    config::LedgerConfig,
    store::{CasOutcome, LedgerStore, StoreError, StoreFuture},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Ledger error types.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The allowance is exhausted for this interval.
    #[error("no tokens left")]
    InsufficientTokens,

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A backing-store call did not answer in time.
    #[error("store call timed out")]
    Timeout,

    /// The conditional update kept losing to concurrent writers.
    #[error("ledger update contention for {username}")]
    Contention { username: String },
}

/// One username's allowance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedgerEntry {
    pub username: String,
    /// Spendable allowance units; never negative.
    pub tokens: u32,
    /// Timestamp of the last allowance grant.
    pub last_reset: DateTime<Utc>,
}

/// Allowance status reported without spending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceStatus {
    pub tokens: u32,
    pub next_reset: DateTime<Utc>,
}

/// The token ledger state machine.
pub struct TokenLedger {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl TokenLedger {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Bring a username's entry up to date and return it.
    ///
    /// Creates the entry on first contact, applies at most one replenishment
    /// grant, otherwise leaves the entry untouched. Idempotent within the
    /// reset interval.
    pub async fn ensure_current(&self, username: &str) -> Result<TokenLedgerEntry, LedgerError> {
        self.ensure_current_at(username, Utc::now()).await
    }

    /// Consume one token, or fail with [`LedgerError::InsufficientTokens`].
    pub async fn spend(&self, username: &str) -> Result<TokenLedgerEntry, LedgerError> {
        self.spend_at(username, Utc::now()).await
    }

    /// Report the allowance without spending.
    pub async fn peek(&self, username: &str) -> Result<AllowanceStatus, LedgerError> {
        let entry = self.ensure_current(username).await?;
        Ok(AllowanceStatus {
            tokens: entry.tokens,
            next_reset: entry.last_reset + self.config.reset_interval(),
        })
    }

    pub(crate) async fn ensure_current_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenLedgerEntry, LedgerError> {
        for _ in 0..self.config.max_cas_retries {
            let entry = match self.timed(self.store.fetch(username)).await? {
                Some(entry) => entry,
                None => {
                    let seeded = TokenLedgerEntry {
                        username: username.to_string(),
                        tokens: self.config.seed_tokens,
                        last_reset: now,
                    };
                    debug!(username = %username, tokens = seeded.tokens, "Seeding ledger entry");
                    self.timed(self.store.insert_if_absent(seeded)).await?
                }
            };

            if now.signed_duration_since(entry.last_reset) < self.config.reset_interval() {
                return Ok(entry);
            }

            // One grant per call that crosses the threshold, no matter how
            // many intervals have elapsed since last_reset.
            let refreshed = TokenLedgerEntry {
                tokens: entry.tokens + self.config.replenish_tokens,
                last_reset: now,
                ..entry.clone()
            };

            match self
                .timed(self.store.compare_and_swap(&entry, refreshed.clone()))
                .await?
            {
                CasOutcome::Updated => {
                    debug!(
                        username = %username,
                        tokens = refreshed.tokens,
                        "Replenished allowance"
                    );
                    return Ok(refreshed);
                }
                // A concurrent call already moved the entry; re-read and
                // re-evaluate so the grant is applied at most once.
                CasOutcome::VersionMismatch | CasOutcome::Missing => continue,
            }
        }

        warn!(username = %username, "Ledger refresh kept losing the version race");
        Err(LedgerError::Contention {
            username: username.to_string(),
        })
    }

    pub(crate) async fn spend_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenLedgerEntry, LedgerError> {
        for _ in 0..self.config.max_cas_retries {
            let entry = self.ensure_current_at(username, now).await?;

            if entry.tokens == 0 {
                debug!(username = %username, "Spend rejected, allowance exhausted");
                return Err(LedgerError::InsufficientTokens);
            }

            let spent = TokenLedgerEntry {
                tokens: entry.tokens - 1,
                ..entry.clone()
            };

            match self
                .timed(self.store.compare_and_swap(&entry, spent.clone()))
                .await?
            {
                CasOutcome::Updated => {
                    debug!(username = %username, remaining = spent.tokens, "Token spent");
                    return Ok(spent);
                }
                // Lost the race against another spend or a replenishment;
                // re-check the balance before trying again.
                CasOutcome::VersionMismatch | CasOutcome::Missing => continue,
            }
        }

        warn!(username = %username, "Spend kept losing the version race");
        Err(LedgerError::Contention {
            username: username.to_string(),
        })
    }

    async fn timed<T>(&self, fut: StoreFuture<'_, T>) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(LedgerError::Timeout),
        }
    }
}
