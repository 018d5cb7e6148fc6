//! # Evidence Service
//!
//! The remote half of caseterm. It registers and authenticates detectives,
//! verifies bearer tokens and releases the sealed evidence.
//!
//! ## Authorization boundary
//!
//! Puzzle progress lives only in the console ([`crate::terminal`]) and is
//! never transmitted. [`EvidenceService::reveal_secret`] therefore checks the
//! bearer token and nothing else: any holder of a valid token receives the
//! payload whether or not they solved a single clue. The console's clue gates
//! are a user-experience device, not a security control.
//!
//! The service keeps no per-request state. Its only shared mutable resource
//! is the account [`Storage`], which enforces username uniqueness itself.

pub mod model;
pub mod token;

use chrono::{Duration, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, EvidenceConfig};
use crate::logutil::escape_log;
use crate::storage::{Account, Storage, StorageError};
use crate::validation::validate_credentials;
use model::{AdditionalInfo, AuthGrant, CaseStatus, Health, SecretPayload, UserProfile};
use token::TokenSigner;

/// Failures surfaced to API callers. `Display` is the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("ACCESS_DENIED: Authentication token required")]
    MissingToken,

    /// Same message for unknown users and wrong passwords.
    #[error("AUTHENTICATION_FAILED: Invalid credentials")]
    InvalidCredentials,

    #[error("INVALID_TOKEN: Authentication failed")]
    InvalidToken,

    #[error("ERROR: User already exists")]
    Conflict,

    #[error("USER_NOT_FOUND: Invalid token")]
    UserNotFound,

    #[error("{0}")]
    Internal(&'static str),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::MissingToken | ServiceError::InvalidCredentials => 401,
            ServiceError::InvalidToken => 403,
            ServiceError::UserNotFound => 404,
            ServiceError::Conflict => 409,
            ServiceError::Internal(_) => 500,
        }
    }
}

pub const INVESTIGATION_STEPS: [&str; 3] = ["CIPHER_DECRYPTION", "SYSTEM_SCAN", "EVIDENCE_ACCESS"];

pub struct EvidenceService {
    storage: Arc<Storage>,
    signer: TokenSigner,
    evidence: EvidenceConfig,
    environment: String,
}

impl EvidenceService {
    pub fn new(
        storage: Storage,
        signer: TokenSigner,
        evidence: EvidenceConfig,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            signer,
            evidence,
            environment: environment.into(),
        }
    }

    /// Build the service from configuration: open the account store with the
    /// configured argon2 parameters and set up token signing.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let params = config.security.as_ref().and_then(|s| s.argon2_params());
        let storage = Storage::new_with_params(&config.storage.data_dir, params).await?;
        let ttl = Duration::hours(i64::from(config.auth.token_ttl_hours));
        let signer = if config.auth.token_secret.is_empty() {
            warn!("auth.token_secret is empty; using an ephemeral signing key (tokens will not survive a restart)");
            TokenSigner::ephemeral(ttl)
        } else {
            TokenSigner::new(config.auth.token_secret.as_bytes(), ttl)
        };
        Ok(Self::new(
            storage,
            signer,
            config.evidence.clone(),
            config.server.environment.clone(),
        ))
    }

    fn grant(&self, account: &Account, failure: &'static str) -> Result<AuthGrant, ServiceError> {
        let token = self
            .signer
            .issue(&account.id, &account.username)
            .map_err(|e| {
                error!("Token issue failed for {}: {}", account.id, e);
                ServiceError::Internal(failure)
            })?;
        Ok(AuthGrant {
            token,
            user: profile(account),
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<AuthGrant, ServiceError> {
        validate_credentials(username, password)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        match self.storage.register(username, password).await {
            Ok(account) => {
                info!(target: "security", "register ok user={} id={}", escape_log(username), account.id);
                self.grant(&account, "SYSTEM_ERROR: Registration failed")
            }
            Err(StorageError::Duplicate(_)) => {
                info!(target: "security", "register rejected (duplicate) user={}", escape_log(username));
                Err(ServiceError::Conflict)
            }
            Err(StorageError::Other(e)) => {
                error!("Registration error: {:#}", e);
                Err(ServiceError::Internal("SYSTEM_ERROR: Registration failed"))
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthGrant, ServiceError> {
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation(
                "ERROR: Username and password required".to_string(),
            ));
        }
        match self.storage.authenticate(username, password).await {
            Ok(Some(account)) => {
                info!(target: "security", "login ok user={}", escape_log(username));
                self.grant(&account, "SYSTEM_ERROR: Login failed")
            }
            Ok(None) => {
                warn!(target: "security", "login failed user={}", escape_log(username));
                Err(ServiceError::InvalidCredentials)
            }
            Err(e) => {
                error!("Login error: {:#}", e);
                Err(ServiceError::Internal("SYSTEM_ERROR: Login failed"))
            }
        }
    }

    /// Check a bearer token without touching the account store.
    fn authorize(&self, token: Option<&str>) -> Result<token::Claims, ServiceError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::MissingToken)?;
        self.signer.verify(token).map_err(|e| {
            warn!(target: "security", "token rejected: {}", e);
            ServiceError::InvalidToken
        })
    }

    /// Resolve the account behind a token.
    pub async fn verify(&self, token: Option<&str>) -> Result<UserProfile, ServiceError> {
        let claims = self.authorize(token)?;
        match self.storage.find_by_id(&claims.sub).await {
            Ok(Some(account)) => Ok(profile(&account)),
            Ok(None) => Err(ServiceError::UserNotFound),
            Err(e) => {
                error!("Token verification error: {:#}", e);
                Err(ServiceError::Internal("SYSTEM_ERROR: Verification failed"))
            }
        }
    }

    /// Release the evidence to any valid token holder. Puzzle completion is
    /// not (and cannot be) checked here.
    pub async fn reveal_secret(&self, token: Option<&str>) -> Result<SecretPayload, ServiceError> {
        let claims = self.authorize(token)?;
        info!(target: "security", "evidence revealed to user={}", escape_log(&claims.username));
        let e = &self.evidence;
        Ok(SecretPayload {
            secret_key: e.secret_key.clone(),
            message: "CASE SOLVED: You have successfully recovered all evidence files for the defense!"
                .to_string(),
            achievement: e.achievement.clone(),
            level: e.level.clone(),
            completed_at: Utc::now(),
            additional_info: AdditionalInfo {
                clues_found: INVESTIGATION_STEPS.len() as u32,
                total_steps: INVESTIGATION_STEPS.iter().map(|s| s.to_string()).collect(),
                difficulty: e.difficulty.clone(),
                hint: e.hint.clone(),
            },
        })
    }

    pub async fn case_status(&self, token: Option<&str>) -> Result<CaseStatus, ServiceError> {
        self.authorize(token)?;
        Ok(CaseStatus {
            investigation_active: true,
            steps_required: INVESTIGATION_STEPS.len() as u32,
            current_step: "EVIDENCE_RECOVERY".to_string(),
            hint: "Execute the access command you discovered to recover the evidence files"
                .to_string(),
            warning: "Only authorized detectives may access case files".to_string(),
        })
    }

    pub fn health(&self) -> Health {
        Health {
            status: "online".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: self.environment.clone(),
        }
    }
}

fn profile(account: &Account) -> UserProfile {
    UserProfile {
        id: account.id.clone(),
        username: account.username.clone(),
        created_at: account.created_at,
        last_login: account.last_login,
    }
}
