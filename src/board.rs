// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Append-only message gateway.
//!
//! Messages are validated and stamped at write time: alongside the raw
//! timestamp, human-readable date/time/month/year renderings are computed in
//! a fixed UTC+05:30 offset and persisted with the record, so what readers
//! see never depends on the server's clock zone or locale.

use crate::store::{MessageStore, StoreError, StoreFuture};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Maximum message length in characters.
pub const MAX_CONTENT_CHARS: usize = 5_000_000;

/// Display fields are rendered in this fixed offset (UTC+05:30).
const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Board error types.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Message content is empty.
    #[error("message content is empty")]
    EmptyContent,

    /// Message content exceeds [`MAX_CONTENT_CHARS`].
    #[error("message content exceeds {MAX_CONTENT_CHARS} characters")]
    ContentTooLarge,

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A backing-store call did not answer in time.
    #[error("store call timed out")]
    Timeout,
}

/// A stored message record. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub time: String,
    pub month: String,
    pub year: String,
}

/// Date/time renderings persisted with each message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    pub date: String,
    pub time: String,
    pub month: String,
    pub year: String,
}

/// Check content length bounds without touching the store.
///
/// Callers gate on this before paying for the post, so an invalid message
/// never costs a token.
pub fn validate_content(content: &str) -> Result<(), BoardError> {
    if content.is_empty() {
        return Err(BoardError::EmptyContent);
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(BoardError::ContentTooLarge);
    }
    Ok(())
}

/// Render the display fields for a timestamp in the fixed UTC+05:30 offset.
pub fn display_fields(created_at: DateTime<Utc>) -> DisplayFields {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)
        .expect("UTC+05:30 is a valid offset");
    let local = created_at.with_timezone(&offset);

    DisplayFields {
        date: local.format("%d/%m/%Y").to_string(),
        time: local.format("%I:%M:%S %P").to_string(),
        month: local.format("%B").to_string(),
        year: local.format("%Y").to_string(),
    }
}

/// Gateway over the message store.
pub struct MessageBoard {
    store: Arc<dyn MessageStore>,
    store_timeout: Duration,
}

impl MessageBoard {
    /// Create a board over the given store.
    pub fn new(store: Arc<dyn MessageStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Validate and persist a message, returning the stored record.
    pub async fn append(
        &self,
        author: &str,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Result<Message, BoardError> {
        validate_content(&content)?;

        let fields = display_fields(created_at);
        let message = Message {
            id: Uuid::new_v4(),
            author: author.to_string(),
            content,
            created_at,
            date: fields.date,
            time: fields.time,
            month: fields.month,
            year: fields.year,
        };

        self.timed(self.store.append(message.clone())).await?;
        debug!(author = %author, id = %message.id, "Message stored");

        Ok(message)
    }

    /// Return every message, oldest first.
    pub async fn list_all(&self) -> Result<Vec<Message>, BoardError> {
        self.timed(self.store.list_all()).await
    }

    async fn timed<T>(&self, fut: StoreFuture<'_, T>) -> Result<T, BoardError> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BoardError::Timeout),
        }
    }
}
