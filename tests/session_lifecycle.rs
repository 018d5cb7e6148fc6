//! Login, register, restore and logout through the console session.
mod common;

use std::sync::Arc;

use caseterm::client::{ApiError, EvidenceApi, LocalClient};
use caseterm::service::model::{AuthGrant, CaseStatus, Health, SecretPayload, UserProfile};
use caseterm::terminal::{execute, TerminalContext, TerminalError, TokenStore};

#[tokio::test]
async fn login_then_verify_returns_the_same_user() {
    let (_tmp, svc) = common::service().await;
    let api = LocalClient::new(Arc::clone(&svc));
    api.register("moran", "tiger123").await.unwrap();

    let grant = api.login("moran", "tiger123").await.unwrap();
    let user = api.verify(&grant.token).await.unwrap();
    assert_eq!(user.id, grant.user.id);
    assert_eq!(user.username, grant.user.username);
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn console_login_and_logout() {
    let (_tmp, svc) = common::service().await;
    LocalClient::new(Arc::clone(&svc))
        .register("holmes", "baker221")
        .await
        .unwrap();
    let ctx = common::context(&svc);

    let r = execute("login holmes wrongpass", &ctx).await.unwrap();
    assert_eq!(
        r.error,
        Some(TerminalError::Auth(
            "AUTHENTICATION_FAILED: Invalid credentials".to_string()
        ))
    );
    assert!(!ctx.auth.is_authenticated());

    let r = execute("login holmes baker221", &ctx).await.unwrap();
    assert!(r.success);
    assert!(r.output.iter().any(|l| l == "Welcome, Detective holmes!"));

    let r = execute("login holmes baker221", &ctx).await.unwrap();
    assert_eq!(
        r.lines(),
        vec!["Already authenticated as Detective holmes. Use \"logout\" first.".to_string()]
    );

    let who = execute("whoami", &ctx).await.unwrap();
    assert!(who.output.iter().any(|l| l == "Detective ID: holmes"));

    assert!(execute("logout", &ctx).await.unwrap().success);
    let r = execute("logout", &ctx).await.unwrap();
    assert_eq!(
        r.lines(),
        vec!["Not currently authenticated as detective".to_string()]
    );
    let who = execute("whoami", &ctx).await.unwrap();
    assert!(who.output.iter().any(|l| l == "Status: UNAUTHORIZED"));
}

#[tokio::test]
async fn register_errors_come_back_verbatim() {
    let (_tmp, svc) = common::service().await;
    let a = common::context(&svc);
    let b = common::context(&svc);

    let r = execute("register ab secret", &a).await.unwrap();
    assert_eq!(
        r.error,
        Some(TerminalError::Validation(
            "ERROR: Username min 3 chars, password min 6 chars".to_string()
        ))
    );
    let r = execute("register onlyname", &a).await.unwrap();
    assert_eq!(
        r.lines(),
        vec!["Usage: register <username> <password>".to_string()]
    );

    assert!(execute("register hopkins inspector", &a).await.unwrap().success);
    let r = execute("register hopkins another1", &b).await.unwrap();
    assert_eq!(
        r.error,
        Some(TerminalError::Conflict("ERROR: User already exists".to_string()))
    );
    assert!(!b.auth.is_authenticated());
}

#[tokio::test]
async fn restore_resumes_a_valid_persisted_token() {
    let (tmp, svc) = common::service().await;
    let token_path = tmp.path().join("session.token");
    let api = Arc::new(LocalClient::new(Arc::clone(&svc)));

    let first = TerminalContext::new(Arc::clone(&api), TokenStore::file(&token_path));
    execute("register athelney jones1", &first).await.unwrap();
    assert!(token_path.exists());

    let second = TerminalContext::restore(Arc::clone(&api), TokenStore::file(&token_path)).await;
    assert_eq!(
        second.auth.user().map(|u| u.username),
        Some("athelney".to_string())
    );
    // Puzzle progress never carries over
    assert_eq!(second.progress.clues_found(), 0);
}

#[tokio::test]
async fn restore_discards_a_token_the_service_rejects() {
    let (tmp, svc) = common::service().await;
    let token_path = tmp.path().join("session.token");

    let ctx = TerminalContext::new(
        Arc::new(LocalClient::new(Arc::clone(&svc))),
        TokenStore::file(&token_path),
    );
    execute("register wiggins street1", &ctx).await.unwrap();

    // Same accounts, different signing key: the old token no longer verifies
    let rotated = common::service_in(&tmp, b"rotated-secret").await;
    let ctx = TerminalContext::restore(
        Arc::new(LocalClient::new(rotated)),
        TokenStore::file(&token_path),
    )
    .await;
    assert!(!ctx.auth.is_authenticated());
    assert!(!token_path.exists());
}

/// Delegates to a real service but refuses every token on protected calls,
/// as after a key rotation.
struct RevokingApi(LocalClient);

impl EvidenceApi for RevokingApi {
    async fn register(&self, u: &str, p: &str) -> Result<AuthGrant, ApiError> {
        self.0.register(u, p).await
    }
    async fn login(&self, u: &str, p: &str) -> Result<AuthGrant, ApiError> {
        self.0.login(u, p).await
    }
    async fn verify(&self, _token: &str) -> Result<UserProfile, ApiError> {
        Err(revoked())
    }
    async fn reveal_secret(&self, _token: &str) -> Result<SecretPayload, ApiError> {
        Err(revoked())
    }
    async fn case_status(&self, _token: &str) -> Result<CaseStatus, ApiError> {
        Err(revoked())
    }
    async fn health(&self) -> Result<Health, ApiError> {
        self.0.health().await
    }
}

fn revoked() -> ApiError {
    ApiError::Unauthorized("INVALID_TOKEN: Authentication failed".to_string())
}

#[tokio::test]
async fn rejected_token_ends_the_session_on_use() {
    let (_tmp, svc) = common::service().await;
    let store = TokenStore::memory();
    let ctx = TerminalContext::new(
        Arc::new(RevokingApi(LocalClient::new(Arc::clone(&svc)))),
        store,
    );
    execute("register langdale pike123", &ctx).await.unwrap();
    assert!(ctx.auth.is_authenticated());

    let r = execute("access-evidence", &ctx).await.unwrap();
    assert_eq!(
        r.error,
        Some(TerminalError::Auth(
            "INVALID_TOKEN: Authentication failed".to_string()
        ))
    );
    assert!(!ctx.auth.is_authenticated());
    // The flag was recorded before the service refused
    assert_eq!(ctx.progress.clues_found(), 1);

    let status = execute("status", &ctx).await.unwrap();
    assert!(status.output.iter().any(|l| l == "Authentication: INACTIVE"));
}

#[tokio::test]
async fn status_invalidates_a_refused_session() {
    let (_tmp, svc) = common::service().await;
    let ctx = TerminalContext::new(
        Arc::new(RevokingApi(LocalClient::new(Arc::clone(&svc)))),
        TokenStore::memory(),
    );
    execute("register bradstreet inspect1", &ctx).await.unwrap();

    let status = execute("status", &ctx).await.unwrap();
    assert!(status.success);
    assert!(status.output.iter().any(|l| l == "Authentication: INACTIVE"));
    assert!(status.output.iter().any(|l| l == "Access Level: GUEST"));
    assert!(!ctx.auth.is_authenticated());
}
