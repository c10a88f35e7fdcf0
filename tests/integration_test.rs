// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Integration tests for the message board service.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use message_board::{
    auth::CredentialVerifier,
    board::MessageBoard,
    config::{AuthConfig, Config, LedgerConfig},
    handlers::{
        allowance, list_messages, login, post_message, recover, AppState, AuthUser, LoginRequest,
        PostMessageRequest, RecoverRequest,
    },
    ledger::{LedgerError, TokenLedger},
    metrics::Metrics,
    store::memory::MemoryStore,
    upload::UploadStore,
    ApiError,
};

fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        shared_password: "open-sesame".to_string(),
        recovery_hashes: [
            Some(bcrypt::hash("blue", 4).unwrap()),
            Some(bcrypt::hash("rex", 4).unwrap()),
            Some(bcrypt::hash("pune", 4).unwrap()),
            Some(bcrypt::hash("chess", 4).unwrap()),
            Some(bcrypt::hash("mango", 4).unwrap()),
        ],
        ..AuthConfig::default()
    }
}

async fn test_state() -> Arc<AppState> {
    let config = Config {
        users: vec!["alice".to_string(), "bob".to_string()],
        auth: test_auth_config(),
        ..Config::default()
    };

    let store = Arc::new(MemoryStore::with_users(config.users.iter().cloned()));
    let upload_dir = std::env::temp_dir().join(format!("mb-it-{}", uuid::Uuid::new_v4()));
    let uploads = UploadStore::new(&message_board::config::UploadConfig {
        dir: upload_dir.display().to_string(),
        ..Default::default()
    })
    .await
    .unwrap();

    Arc::new(AppState {
        ledger: TokenLedger::new(store.clone(), config.ledger.clone()),
        board: MessageBoard::new(store.clone(), Duration::from_secs(5)),
        verifier: CredentialVerifier::new(config.auth.clone()),
        directory: store,
        uploads,
        metrics: Metrics::new().unwrap(),
        config,
    })
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn login_issues_a_verifiable_credential() {
    let state = test_state().await;

    let Json(response) = login(
        State(state.clone()),
        Json(LoginRequest {
            username: "alice".to_string(),
            password: "open-sesame".to_string(),
        }),
    )
    .await
    .unwrap();

    let username = state.verifier.verify(Some(&response.token)).unwrap();
    assert_eq!(username, "alice");
}

#[tokio::test]
async fn login_rejects_unknown_user_and_wrong_password() {
    let state = test_state().await;

    let unknown = login(
        State(state.clone()),
        Json(LoginRequest {
            username: "mallory".to_string(),
            password: "open-sesame".to_string(),
        }),
    )
    .await;
    assert!(matches!(unknown, Err(ApiError::UnknownUser)));

    let wrong = login(
        State(state),
        Json(LoginRequest {
            username: "alice".to_string(),
            password: "guess".to_string(),
        }),
    )
    .await;
    assert!(matches!(wrong, Err(ApiError::WrongPassword)));
}

#[tokio::test]
async fn recovery_reveals_the_codeword_at_the_threshold() {
    let state = test_state().await;

    let answers = |values: [&str; 5]| values.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let Json(ok) = recover(
        State(state.clone()),
        Json(RecoverRequest {
            username: "alice".to_string(),
            answers: answers(["BLUE ", "rex", " Pune", "wrong", "wrong"]),
        }),
    )
    .await
    .unwrap();
    assert_eq!(ok.codeword, "open-sesame");

    let too_few = recover(
        State(state),
        Json(RecoverRequest {
            username: "alice".to_string(),
            answers: answers(["blue", "rex", "wrong", "wrong", "wrong"]),
        }),
    )
    .await;
    assert!(matches!(too_few, Err(ApiError::RecoveryFailed)));
}

#[tokio::test]
async fn fresh_user_posts_once_then_hits_the_gate() {
    let state = test_state().await;
    let user = Extension(AuthUser("alice".to_string()));

    // First post spends the seeded token.
    let created = post_message(
        State(state.clone()),
        user.clone(),
        Json(PostMessageRequest {
            content: Some("hello world".to_string()),
        }),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_text(created).await, "Message saved");

    // Second post within the window is refused with the stable body.
    let denied = post_message(
        State(state.clone()),
        user,
        Json(PostMessageRequest {
            content: Some("one more".to_string()),
        }),
    )
    .await
    .err()
    .unwrap()
    .into_response();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(denied).await, "No tokens left. Wait for reset");

    // Only the first message made it to the timeline.
    let Json(timeline) = list_messages(State(state), Extension(AuthUser("bob".to_string())))
        .await
        .unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].author, "alice");
    assert_eq!(timeline[0].content, "hello world");
}

#[tokio::test]
async fn invalid_content_never_costs_a_token() {
    let state = test_state().await;
    let user = Extension(AuthUser("alice".to_string()));

    let missing = post_message(
        State(state.clone()),
        user.clone(),
        Json(PostMessageRequest { content: None }),
    )
    .await;
    assert!(matches!(missing, Err(ApiError::MissingContent)));

    let empty = post_message(
        State(state.clone()),
        user.clone(),
        Json(PostMessageRequest {
            content: Some(String::new()),
        }),
    )
    .await;
    assert!(matches!(empty, Err(ApiError::EmptyContent)));

    // The seeded token is still there.
    let Json(status) = allowance(State(state), user).await.unwrap();
    assert_eq!(status.tokens, 1);
}

#[tokio::test]
async fn allowance_reports_the_next_reset() {
    let state = test_state().await;

    let Json(status) = allowance(State(state.clone()), Extension(AuthUser("carol".to_string())))
        .await
        .unwrap();
    assert_eq!(status.tokens, 1);

    let entry = state.ledger.ensure_current("carol").await.unwrap();
    assert_eq!(
        status.next_reset,
        entry.last_reset + chrono::Duration::days(14)
    );
}

#[tokio::test]
async fn timeline_is_ascending_for_every_reader() {
    let state = test_state().await;

    let base = Utc::now();
    for (i, author) in ["alice", "bob", "alice"].iter().enumerate() {
        state
            .board
            .append(
                author,
                format!("message {i}"),
                base + chrono::Duration::seconds(i as i64),
            )
            .await
            .unwrap();
    }

    let Json(timeline) = list_messages(State(state), Extension(AuthUser("bob".to_string())))
        .await
        .unwrap();
    let contents: Vec<&str> = timeline.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["message 0", "message 1", "message 2"]);
}

#[tokio::test]
async fn ledger_and_verifier_compose_end_to_end() {
    let state = test_state().await;

    // Issue a credential, verify it, and spend under the verified name.
    let token = state.verifier.issue("bob").unwrap();
    let username = state.verifier.verify(Some(&token)).unwrap();

    let entry = state.ledger.spend(&username).await.unwrap();
    assert_eq!(entry.tokens, 0);

    let denied = state.ledger.spend(&username).await;
    assert!(matches!(denied, Err(LedgerError::InsufficientTokens)));
}

#[tokio::test]
async fn ledger_config_drives_the_gate() {
    // A wider seed allows exactly that many posts.
    let store = Arc::new(MemoryStore::new());
    let ledger = TokenLedger::new(
        store,
        LedgerConfig {
            seed_tokens: 3,
            ..LedgerConfig::default()
        },
    );

    for _ in 0..3 {
        ledger.spend("dave").await.unwrap();
    }
    assert!(matches!(
        ledger.spend("dave").await,
        Err(LedgerError::InsufficientTokens)
    ));
}
