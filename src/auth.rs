// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Identity verification for the message board.
//!
//! Authentication is deliberately simple: every valid account shares one
//! password, login exchanges it for a signed bearer credential, and account
//! recovery reveals the shared password again when at least 3 of 5 security
//! answers match their stored hashes. Password and answer hashing are
//! black-box library calls; this module only consumes their yes/no verdicts.

use crate::config::AuthConfig;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Number of recovery questions on file.
pub const RECOVERY_ANSWER_COUNT: usize = 5;

/// Matches required for recovery to succeed.
pub const RECOVERY_THRESHOLD: usize = 3;

/// Credential error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("missing credential")]
    MissingCredential,

    /// The credential failed the signature or expiry check.
    #[error("invalid or expired credential")]
    InvalidCredential,

    /// The supplied password is not the shared secret.
    #[error("wrong password")]
    WrongPassword,

    /// Recovery was attempted with the wrong number of answers.
    #[error("expected {RECOVERY_ANSWER_COUNT} answers")]
    WrongAnswerCount,

    /// Fewer than the required number of answers matched.
    #[error("too few correct answers")]
    RecoveryFailed,

    /// Credential signing failed.
    #[error("could not issue credential")]
    Signing,
}

/// Identity claim embedded in the bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the credential vouches for.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Issues and validates bearer credentials and guards the recovery gate.
pub struct CredentialVerifier {
    config: AuthConfig,
}

impl CredentialVerifier {
    /// Create a verifier with the given configuration.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Produce a signed credential for a username.
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let expiration = Utc::now() + chrono::Duration::days(self.config.token_validity_days);
        let claims = Claims {
            sub: username.to_string(),
            exp: expiration.timestamp() as usize,
        };

        debug!(
            username = %username,
            valid_days = self.config.token_validity_days,
            "Issuing credential"
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            warn!(error = %e, "Credential signing failed");
            AuthError::Signing
        })
    }

    /// Validate a credential and return the username it vouches for.
    pub fn verify(&self, credential: Option<&str>) -> Result<String, AuthError> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;

        let decoded = decode::<Claims>(
            credential,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidCredential)?;

        Ok(decoded.claims.sub)
    }

    /// Check the supplied password against the shared secret.
    pub fn check_password(&self, password: &str) -> Result<(), AuthError> {
        if password == self.config.shared_password {
            Ok(())
        } else {
            Err(AuthError::WrongPassword)
        }
    }

    /// Run the threshold recovery gate and reveal the shared secret on success.
    ///
    /// Each answer is trimmed and lowercased before comparison. An empty
    /// answer, or a question with no stored hash, is skipped entirely; it
    /// counts neither for nor against the threshold.
    pub fn recover(&self, answers: &[String]) -> Result<String, AuthError> {
        if answers.len() != RECOVERY_ANSWER_COUNT {
            return Err(AuthError::WrongAnswerCount);
        }

        let mut correct = 0;
        for (answer, stored) in answers.iter().zip(self.config.recovery_hashes.iter()) {
            let normalized = answer.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            let Some(hash) = stored else {
                continue;
            };
            if bcrypt::verify(&normalized, hash).unwrap_or(false) {
                correct += 1;
            }
        }

        debug!(correct, threshold = RECOVERY_THRESHOLD, "Recovery gate evaluated");

        if correct >= RECOVERY_THRESHOLD {
            Ok(self.config.shared_password.clone())
        } else {
            Err(AuthError::RecoveryFailed)
        }
    }
}
