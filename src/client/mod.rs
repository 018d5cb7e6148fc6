//! Clients for the evidence service.
//!
//! [`EvidenceApi`] is the seam the console talks through. [`HttpClient`]
//! speaks the REST surface with reqwest; [`LocalClient`] calls an in-process
//! [`EvidenceService`] directly (offline play and tests). Both present
//! failures as [`ApiError`], classified by HTTP status.

use log::debug;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::service::model::{AuthGrant, CaseStatus, Envelope, Health, SecretPayload, UserProfile, VerifiedUser};
use crate::service::EvidenceService;

/// A failed service call. `Display` is the server's message, verbatim where
/// the server supplied one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    /// 401/403: credentials or token rejected
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Server(String),
    /// No usable response (connect failure, timeout, undecodable body)
    #[error("{0}")]
    Network(String),
}

impl ApiError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => ApiError::Validation(message),
            401 | 403 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Server(message),
        }
    }

    /// True when the bearer token (or the account behind it) was refused.
    pub fn rejects_token(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::NotFound(_))
    }
}

pub trait EvidenceApi: Send + Sync {
    fn register(&self, username: &str, password: &str) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;
    fn login(&self, username: &str, password: &str) -> impl Future<Output = Result<AuthGrant, ApiError>> + Send;
    fn verify(&self, token: &str) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;
    fn reveal_secret(&self, token: &str) -> impl Future<Output = Result<SecretPayload, ApiError>> + Send;
    fn case_status(&self, token: &str) -> impl Future<Output = Result<CaseStatus, ApiError>> + Send;
    fn health(&self) -> impl Future<Output = Result<Health, ApiError>> + Send;
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // A trailing slash keeps any path prefix (e.g. /api) when joining routes
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized)
            .map_err(|e| anyhow::anyhow!("invalid base URL {}: {}", base_url, e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    fn url(&self, route: &str) -> Result<Url, ApiError> {
        self.base
            .join(route)
            .map_err(|e| ApiError::Network(format!("Network error: {e}")))
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let resp = request.send().await.map_err(|e| {
            debug!("request failed: {}", e);
            ApiError::Network("Network error".to_string())
        })?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Network error: {e}")))?;
        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(Envelope {
                success: true,
                data: Some(data),
                ..
            }) if status.is_success() => Ok(data),
            Ok(envelope) => Err(ApiError::from_status(status.as_u16(), envelope.message)),
            Err(e) if status.is_success() => {
                Err(ApiError::Network(format!("Malformed response: {e}")))
            }
            Err(_) => Err(ApiError::from_status(
                status.as_u16(),
                format!("HTTP {}", status),
            )),
        }
    }
}

impl EvidenceApi for HttpClient {
    async fn register(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let url = self.url("auth/register")?;
        self.call(self.client.post(url).json(&Credentials { username, password }))
            .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let url = self.url("auth/login")?;
        self.call(self.client.post(url).json(&Credentials { username, password }))
            .await
    }

    async fn verify(&self, token: &str) -> Result<UserProfile, ApiError> {
        let url = self.url("auth/verify")?;
        let verified: VerifiedUser = self.call(self.client.get(url).bearer_auth(token)).await?;
        Ok(verified.user)
    }

    async fn reveal_secret(&self, token: &str) -> Result<SecretPayload, ApiError> {
        let url = self.url("secret/reveal")?;
        self.call(self.client.get(url).bearer_auth(token)).await
    }

    async fn case_status(&self, token: &str) -> Result<CaseStatus, ApiError> {
        let url = self.url("secret/status")?;
        self.call(self.client.get(url).bearer_auth(token)).await
    }

    async fn health(&self) -> Result<Health, ApiError> {
        let url = self.url("health")?;
        self.call(self.client.get(url)).await
    }
}

/// In-process client: same contract, no sockets.
#[derive(Clone)]
pub struct LocalClient {
    service: Arc<EvidenceService>,
}

impl LocalClient {
    pub fn new(service: Arc<EvidenceService>) -> Self {
        Self { service }
    }
}

fn local_err(e: crate::service::ServiceError) -> ApiError {
    ApiError::from_status(e.status_code(), e.to_string())
}

impl EvidenceApi for LocalClient {
    async fn register(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        self.service.register(username, password).await.map_err(local_err)
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ApiError> {
        self.service.login(username, password).await.map_err(local_err)
    }

    async fn verify(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.service.verify(Some(token)).await.map_err(local_err)
    }

    async fn reveal_secret(&self, token: &str) -> Result<SecretPayload, ApiError> {
        self.service.reveal_secret(Some(token)).await.map_err(local_err)
    }

    async fn case_status(&self, token: &str) -> Result<CaseStatus, ApiError> {
        self.service.case_status(Some(token)).await.map_err(local_err)
    }

    async fn health(&self) -> Result<Health, ApiError> {
        Ok(self.service.health())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(matches!(ApiError::from_status(400, "x".into()), ApiError::Validation(_)));
        assert!(ApiError::from_status(401, "x".into()).rejects_token());
        assert!(ApiError::from_status(403, "x".into()).rejects_token());
        assert!(matches!(ApiError::from_status(409, "x".into()), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from_status(502, "x".into()), ApiError::Server(_)));
        assert!(!ApiError::Network("down".into()).rejects_token());
    }

    #[test]
    fn base_url_keeps_prefix() {
        let c = HttpClient::new("http://localhost:3001/api", Duration::from_secs(1)).unwrap();
        assert_eq!(c.url("auth/login").unwrap().as_str(), "http://localhost:3001/api/auth/login");
        let c = HttpClient::new("http://localhost:3001", Duration::from_secs(1)).unwrap();
        assert_eq!(c.url("health").unwrap().as_str(), "http://localhost:3001/health");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let c = HttpClient::new(&format!("http://{}", addr), Duration::from_millis(500)).unwrap();
        let err = c.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    }
}
