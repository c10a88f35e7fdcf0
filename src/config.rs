// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the message board service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the message board service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Usernames known to the identity store
    #[serde(default)]
    pub users: Vec<String>,

    /// Maximum accepted request body in bytes (default: 32 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Credential configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Token ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// File upload configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Credential configuration.
///
/// The signing key and the shared password have no usable defaults; the
/// server refuses to start without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for signing bearer credentials
    #[serde(default)]
    pub jwt_secret: String,

    /// The single password shared by every account
    #[serde(default)]
    pub shared_password: String,

    /// Stored recovery-answer hashes; a missing slot is skipped during recovery
    #[serde(default = "default_recovery_hashes")]
    pub recovery_hashes: [Option<String>; 5],

    /// Credential validity window in days (default: 30)
    #[serde(default = "default_token_validity_days")]
    pub token_validity_days: i64,
}

/// Token ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Tokens granted when a username is first observed (default: 1)
    #[serde(default = "default_seed_tokens")]
    pub seed_tokens: u32,

    /// Tokens granted per replenishment (default: 1)
    #[serde(default = "default_replenish_tokens")]
    pub replenish_tokens: u32,

    /// Replenishment interval in seconds (default: 14 days)
    #[serde(default = "default_reset_interval_secs")]
    pub reset_interval_secs: u64,

    /// Timeout for a single backing-store call in milliseconds (default: 5000)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Bounded retries for the conditional-update loop (default: 8)
    #[serde(default = "default_max_cas_retries")]
    pub max_cas_retries: u32,
}

/// File upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded files are written to (default: ./uploads)
    #[serde(default = "default_upload_dir")]
    pub dir: String,

    /// Public URL prefix uploaded files are served under (default: /files)
    #[serde(default = "default_public_base")]
    pub public_base: String,

    /// Accepted content types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_recovery_hashes() -> [Option<String>; 5] {
    [None, None, None, None, None]
}

fn default_token_validity_days() -> i64 {
    30
}

fn default_seed_tokens() -> u32 {
    1
}

fn default_replenish_tokens() -> u32 {
    1
}

fn default_reset_interval_secs() -> u64 {
    14 * 24 * 60 * 60 // 14 days
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_max_cas_retries() -> u32 {
    8
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_public_base() -> String {
    "/files".to_string()
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "application/pdf".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            users: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
            auth: AuthConfig::default(),
            ledger: LedgerConfig::default(),
            upload: UploadConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            shared_password: String::new(),
            recovery_hashes: default_recovery_hashes(),
            token_validity_days: default_token_validity_days(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            seed_tokens: default_seed_tokens(),
            replenish_tokens: default_replenish_tokens(),
            reset_interval_secs: default_reset_interval_secs(),
            store_timeout_ms: default_store_timeout_ms(),
            max_cas_retries: default_max_cas_retries(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            public_base: default_public_base(),
            allowed_types: default_allowed_types(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl LedgerConfig {
    /// Get the replenishment interval
    pub fn reset_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reset_interval_secs as i64)
    }

    /// Get the backing-store call timeout
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
