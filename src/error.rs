// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy and HTTP mapping.
//!
//! Handler errors collapse to a status code plus a short message; backend
//! details are logged, never sent to the client.

use crate::{auth::AuthError, board::BoardError, ledger::LedgerError, upload::UploadError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Application error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing message content")]
    MissingContent,

    #[error("Message content cannot be empty")]
    EmptyContent,

    #[error("Message content too large")]
    ContentTooLarge,

    #[error("Missing authorization token")]
    MissingCredential,

    #[error("Invalid or expired token")]
    InvalidCredential,

    #[error("No tokens left. Wait for reset")]
    InsufficientTokens,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Expected exactly 5 answers")]
    WrongAnswerCount,

    #[error("Too few correct answers")]
    RecoveryFailed,

    #[error("No file in request")]
    MissingFile,

    #[error("File type not allowed")]
    DisallowedType,

    #[error("Storage unavailable, try again")]
    StoreUnavailable,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingContent | ApiError::EmptyContent => StatusCode::BAD_REQUEST,
            ApiError::ContentTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingCredential | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientTokens => StatusCode::FORBIDDEN,
            ApiError::UnknownUser => StatusCode::NOT_FOUND,
            ApiError::WrongPassword => StatusCode::UNAUTHORIZED,
            ApiError::WrongAnswerCount => StatusCode::BAD_REQUEST,
            ApiError::RecoveryFailed => StatusCode::FORBIDDEN,
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::DisallowedType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientTokens => ApiError::InsufficientTokens,
            LedgerError::Store(e) => {
                error!(error = %e, "Ledger store failure");
                ApiError::StoreUnavailable
            }
            LedgerError::Timeout | LedgerError::Contention { .. } => {
                error!(error = %err, "Ledger unavailable");
                ApiError::StoreUnavailable
            }
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::EmptyContent => ApiError::EmptyContent,
            BoardError::ContentTooLarge => ApiError::ContentTooLarge,
            BoardError::Store(e) => {
                error!(error = %e, "Message store failure");
                ApiError::StoreUnavailable
            }
            BoardError::Timeout => {
                error!("Message store timed out");
                ApiError::StoreUnavailable
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ApiError::MissingCredential,
            AuthError::InvalidCredential => ApiError::InvalidCredential,
            AuthError::WrongPassword => ApiError::WrongPassword,
            AuthError::WrongAnswerCount => ApiError::WrongAnswerCount,
            AuthError::RecoveryFailed => ApiError::RecoveryFailed,
            AuthError::Signing => {
                error!("Credential signing failed");
                ApiError::StoreUnavailable
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => ApiError::MissingFile,
            UploadError::DisallowedType { .. } => ApiError::DisallowedType,
            UploadError::Io(e) => {
                error!(error = %e, "Upload persistence failed");
                ApiError::StoreUnavailable
            }
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        error!(error = %err, "Store failure");
        ApiError::StoreUnavailable
    }
}
