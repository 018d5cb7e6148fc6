//! HTTP surface of the evidence service.
//!
//! Every body is a [`model::Envelope`] `{success, message, data?}`.
//!
//! | route | auth | success |
//! |---|---|---|
//! | `POST /auth/register` | - | 201 `{token, user}` |
//! | `POST /auth/login` | - | 200 `{token, user}` |
//! | `GET /auth/verify` | bearer | 200 `{user}` |
//! | `GET /secret/reveal` | bearer | 200 secret payload |
//! | `GET /secret/status` | bearer | 200 case status |
//! | `GET /health` | - | 200 `{status, timestamp, version, environment}` |
//!
//! Unknown routes answer 404 with `success: false`. A handler that panics
//! answers 500 with `success: false` and the server keeps running.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::FutureExt; // catch_unwind on the handler future
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::service::model::{Envelope, VerifiedUser};
use crate::service::{EvidenceService, ServiceError};

#[derive(Debug, Default, Deserialize)]
struct CredentialsPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

type Shared = State<Arc<EvidenceService>>;

/// Build the router around a shared service.
pub fn router(service: Arc<EvidenceService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
        .route("/secret/reveal", get(reveal))
        .route("/secret/status", get(case_status))
        .fallback(not_found)
        .with_state(service)
        .layer(middleware::from_fn(catch_panic))
}

/// Turn a panicking handler into a 500 envelope instead of a dropped connection.
async fn catch_panic(req: Request, next: Next) -> Response {
    let route = req.uri().path().to_string();
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                *s
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.as_str()
            } else {
                "panic"
            };
            error!("handler for {} panicked: {}", route, msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::fail("SYSTEM_ERROR: Internal server error")),
            )
                .into_response()
        }
    }
}

/// Serve on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, service: Arc<EvidenceService>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Evidence service listening on {}", addr);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Build the service from config, bind and serve.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(EvidenceService::from_config(config).await?);
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(listener, service).await
}

fn reply<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (status, Json(Envelope::ok(message, data))).into_response()
}

fn failure(err: ServiceError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    debug!("request failed: {} {}", status, err);
    (status, Json(Envelope::fail(err.to_string()))).into_response()
}

/// Token from `Authorization: Bearer <token>`.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_whitespace()
        .nth(1)
}

fn credentials(body: Result<Json<CredentialsPayload>, JsonRejection>) -> CredentialsPayload {
    // Unparseable bodies are treated as missing fields
    body.map(|Json(p)| p).unwrap_or_default()
}

async fn health(State(svc): Shared) -> Response {
    reply(StatusCode::OK, "SYSTEM_STATUS: Server operational", svc.health())
}

async fn register(State(svc): Shared, body: Result<Json<CredentialsPayload>, JsonRejection>) -> Response {
    let creds = credentials(body);
    match svc.register(&creds.username, &creds.password).await {
        Ok(grant) => reply(
            StatusCode::CREATED,
            "REGISTRATION_SUCCESSFUL: Welcome to the system",
            grant,
        ),
        Err(e) => failure(e),
    }
}

async fn login(State(svc): Shared, body: Result<Json<CredentialsPayload>, JsonRejection>) -> Response {
    let creds = credentials(body);
    match svc.login(&creds.username, &creds.password).await {
        Ok(grant) => reply(StatusCode::OK, "LOGIN_SUCCESSFUL: Access granted", grant),
        Err(e) => failure(e),
    }
}

async fn verify(State(svc): Shared, headers: HeaderMap) -> Response {
    match svc.verify(bearer(&headers)).await {
        Ok(user) => reply(
            StatusCode::OK,
            "TOKEN_VALID: Authentication verified",
            VerifiedUser { user },
        ),
        Err(e) => failure(e),
    }
}

async fn reveal(State(svc): Shared, headers: HeaderMap) -> Response {
    match svc.reveal_secret(bearer(&headers)).await {
        Ok(payload) => reply(
            StatusCode::OK,
            "EVIDENCE_RECOVERED: Critical case files successfully accessed",
            payload,
        ),
        Err(e) => failure(e),
    }
}

async fn case_status(State(svc): Shared, headers: HeaderMap) -> Response {
    match svc.case_status(bearer(&headers)).await {
        Ok(status) => reply(
            StatusCode::OK,
            "CASE_STATUS: Legal investigation protocol active",
            status,
        ),
        Err(e) => failure(e),
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::fail(
            "ENDPOINT_NOT_FOUND: The requested resource does not exist",
        )),
    )
        .into_response()
}
