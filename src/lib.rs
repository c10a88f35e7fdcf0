// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Message Board Backend
//!
//! This crate provides a minimal message-board service gated by per-user
//! posting allowances:
//!
//! - Token-ledger rate limiting (one token per post, lazy replenishment)
//! - Bearer-credential authentication (signed token, 30-day validity)
//! - Threshold-based account recovery (3 of 5 answers)
//! - Append-only, time-ordered message timeline
//! - Multipart file upload with content-type allow-list

pub mod auth;
pub mod board;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod store;
pub mod upload;

pub use config::Config;
pub use error::ApiError;
pub use ledger::{TokenLedger, TokenLedgerEntry};
pub use store::memory::MemoryStore;
