// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the message board service.
//!
//! Handlers compose the identity verifier, the token ledger, and the message
//! gateway into the externally visible operations. Protected routes go
//! through [`require_auth`], which swaps the bearer credential for the
//! username it vouches for.

use crate::{
    auth::CredentialVerifier,
    board::{self, MessageBoard},
    config::Config,
    error::ApiError,
    ledger::{AllowanceStatus, TokenLedger},
    metrics::Metrics,
    store::{StoreFuture, UserDirectory},
    upload::UploadStore,
};
use axum::{
    extract::{Multipart, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub ledger: TokenLedger,
    pub board: MessageBoard,
    pub verifier: CredentialVerifier,
    pub directory: Arc<dyn UserDirectory>,
    pub uploads: UploadStore,
    pub metrics: Metrics,
    pub config: Config,
}

/// Username vouched for by the request's bearer credential.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Recovery request body.
#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    pub username: String,
    #[serde(default)]
    pub answers: Vec<String>,
}

/// Recovery response body.
#[derive(Debug, Serialize)]
pub struct RecoverResponse {
    pub codeword: String,
}

/// Message post request body.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
}

/// Upload response body.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Bearer-auth middleware for the protected routes.
///
/// On success the verified username is attached to the request extensions;
/// handlers read it through [`Extension<AuthUser>`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match state.verifier.verify(credential) {
        Ok(username) => {
            debug!(username = %username, "Credential accepted");
            req.extensions_mut().insert(AuthUser(username));
            Ok(next.run(req).await)
        }
        Err(e) => {
            state.metrics.auth_failures.inc();
            warn!(error = %e, "Credential rejected");
            Err(e.into())
        }
    }
}

/// Login endpoint - POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!(username = %req.username, "Login attempt");

    let known = timed(&state, state.directory.contains(&req.username)).await?;
    if !known {
        warn!(username = %req.username, "Login for unknown user");
        return Err(ApiError::UnknownUser);
    }

    state.verifier.check_password(&req.password)?;

    let token = state.verifier.issue(&req.username)?;
    info!(username = %req.username, "Login successful");

    Ok(Json(LoginResponse { token }))
}

/// Recovery endpoint - POST /api/recover
pub async fn recover(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, ApiError> {
    info!(username = %req.username, "Recovery attempt");

    let known = timed(&state, state.directory.contains(&req.username)).await?;
    if !known {
        warn!(username = %req.username, "Recovery for unknown user");
        return Err(ApiError::UnknownUser);
    }

    let codeword = state.verifier.recover(&req.answers)?;
    info!(username = %req.username, "Recovery succeeded");

    Ok(Json(RecoverResponse { codeword }))
}

/// Post a message - POST /api/message
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.ok_or(ApiError::MissingContent)?;

    // Reject invalid content before it can cost a token.
    board::validate_content(&content)?;

    let entry = state.ledger.spend(&username).await.map_err(|e| {
        let api: ApiError = e.into();
        if matches!(api, ApiError::InsufficientTokens) {
            state.metrics.posts_rejected_no_tokens.inc();
        }
        api
    })?;

    let message = state
        .board
        .append(&username, content, chrono::Utc::now())
        .await?;

    state.metrics.posts_accepted.inc();
    info!(
        username = %username,
        id = %message.id,
        remaining = entry.tokens,
        "Message posted"
    );

    Ok((StatusCode::CREATED, "Message saved"))
}

/// List the timeline - GET /api/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(username)): Extension<AuthUser>,
) -> Result<Json<Vec<board::Message>>, ApiError> {
    debug!(username = %username, "Listing messages");
    let messages = state.board.list_all().await?;
    Ok(Json(messages))
}

/// Query the allowance - GET /api/tokens
pub async fn allowance(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(username)): Extension<AuthUser>,
) -> Result<Json<AllowanceStatus>, ApiError> {
    let status = state.ledger.peek(&username).await?;
    debug!(username = %username, tokens = status.tokens, "Allowance queried");
    Ok(Json(status))
}

/// Upload a file - POST /upload
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::MissingFile)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);

        // Allow-list check happens before the body is pulled in.
        state
            .uploads
            .check_content_type(content_type.as_deref())?;

        let bytes = field.bytes().await.map_err(|_| ApiError::MissingFile)?;
        let url = state
            .uploads
            .save(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;

        state.metrics.uploads_stored.inc();
        return Ok(Json(UploadResponse { url }));
    }

    Err(ApiError::MissingFile)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "message-board",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

async fn timed<T>(state: &AppState, fut: StoreFuture<'_, T>) -> Result<T, ApiError> {
    match tokio::time::timeout(state.config.ledger.store_timeout(), fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!("Directory lookup timed out");
            Err(ApiError::StoreUnavailable)
        }
    }
}
