// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the message board.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Request counters, registered against a service-owned registry.
pub struct Metrics {
    registry: Registry,
    pub posts_accepted: IntCounter,
    pub posts_rejected_no_tokens: IntCounter,
    pub auth_failures: IntCounter,
    pub uploads_stored: IntCounter,
}

impl Metrics {
    /// Create and register all counters.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let posts_accepted = IntCounter::new(
            "board_posts_accepted_total",
            "Messages accepted and stored",
        )?;
        let posts_rejected_no_tokens = IntCounter::new(
            "board_posts_rejected_no_tokens_total",
            "Posts rejected because the allowance was exhausted",
        )?;
        let auth_failures = IntCounter::new(
            "board_auth_failures_total",
            "Requests rejected for missing or invalid credentials",
        )?;
        let uploads_stored = IntCounter::new(
            "board_uploads_stored_total",
            "Files accepted by the upload endpoint",
        )?;

        registry.register(Box::new(posts_accepted.clone()))?;
        registry.register(Box::new(posts_rejected_no_tokens.clone()))?;
        registry.register(Box::new(auth_failures.clone()))?;
        registry.register(Box::new(uploads_stored.clone()))?;

        Ok(Self {
            registry,
            posts_accepted,
            posts_rejected_no_tokens,
            auth_failures,
            uploads_stored,
        })
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
