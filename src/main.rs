// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Message Board Service
//!
//! A minimal message-board backend gated by per-user posting allowances:
//!
//! - One token per post, replenished lazily once per reset interval
//! - Shared-password login exchanging the secret for a signed bearer token
//! - 3-of-5 threshold account recovery revealing the shared secret
//! - Append-only timeline, oldest first
//! - Multipart upload with a content-type allow-list
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honored):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `ALLOWED_USERS`: Comma-separated usernames known to the identity store
//! - `JWT_SECRET`: Credential signing key (required)
//! - `BOARD_PASSWORD`: The shared password (required)
//! - `RECOVERY_HASH_1`..`RECOVERY_HASH_5`: bcrypt hashes of the recovery answers
//! - `RESET_INTERVAL_SECS`: Allowance replenishment interval (default: 14 days)
//! - `UPLOAD_DIR`: Directory for uploaded files (default: ./uploads)

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use message_board::{
    auth::CredentialVerifier,
    board::MessageBoard,
    config::{AuthConfig, Config, LedgerConfig, UploadConfig},
    handlers::{
        self, allowance, health, list_messages, login, post_message, recover, require_auth,
        upload_file, AppState,
    },
    ledger::TokenLedger,
    metrics::Metrics,
    store::memory::MemoryStore,
    upload::UploadStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    dotenvy::dotenv().ok();

    // Load configuration
    let config = load_config()?;
    info!(
        bind_addr = %config.bind_addr,
        users = config.users.len(),
        reset_interval_secs = config.ledger.reset_interval_secs,
        "Starting message board"
    );

    // Create application state
    let store = Arc::new(MemoryStore::with_users(config.users.iter().cloned()));
    let ledger = TokenLedger::new(store.clone(), config.ledger.clone());
    let board = MessageBoard::new(store.clone(), config.ledger.store_timeout());
    let verifier = CredentialVerifier::new(config.auth.clone());
    let uploads = UploadStore::new(&config.upload).await?;
    let metrics = Metrics::new()?;

    let upload_dir = uploads.dir().clone();
    let public_base = uploads.public_base().to_string();

    let state = Arc::new(AppState {
        ledger,
        board,
        verifier,
        directory: store,
        uploads,
        metrics,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router; bearer middleware covers only the routes above it
    let mut app = Router::new()
        .route("/api/message", post(post_message))
        .route("/api/messages", get(list_messages))
        .route("/api/tokens", get(allowance))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route("/api/login", post(login))
        .route("/api/recover", post(recover))
        .route("/upload", post(upload_file))
        .route("/health", get(health))
        .nest_service(&public_base, ServeDir::new(upload_dir));

    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(handlers::metrics));
    }

    let app = app
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> anyhow::Result<Config> {
    let auth = AuthConfig {
        jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
        shared_password: std::env::var("BOARD_PASSWORD").context("BOARD_PASSWORD must be set")?,
        recovery_hashes: [
            std::env::var("RECOVERY_HASH_1").ok(),
            std::env::var("RECOVERY_HASH_2").ok(),
            std::env::var("RECOVERY_HASH_3").ok(),
            std::env::var("RECOVERY_HASH_4").ok(),
            std::env::var("RECOVERY_HASH_5").ok(),
        ],
        token_validity_days: std::env::var("TOKEN_VALIDITY_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    };

    Ok(Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        users: std::env::var("ALLOWED_USERS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        auth,
        ledger: LedgerConfig {
            reset_interval_secs: std::env::var("RESET_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(14 * 24 * 60 * 60),
            store_timeout_ms: std::env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            ..Default::default()
        },
        upload: UploadConfig {
            dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ..Default::default()
        },
        ..Default::default()
    })
}
