//! Console-side authentication: the bearer token and who it belongs to.
//!
//! States are ANONYMOUS and AUTHENTICATED. The token is an explicit
//! [`TokenStore`] credential: acquired by login, register or a successful
//! restore, released by logout or when any server call rejects it.

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::client::{ApiError, EvidenceApi};
use crate::logutil::{escape_log, redact_token};
use crate::service::model::{AuthGrant, UserProfile};

/// Where the bearer token survives between runs.
#[derive(Debug)]
pub enum TokenStore {
    File(PathBuf),
    Memory(Mutex<Option<String>>),
}

impl TokenStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        TokenStore::File(path.into())
    }

    pub fn memory() -> Self {
        TokenStore::Memory(Mutex::new(None))
    }

    fn slot(m: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn load(&self) -> Option<String> {
        match self {
            TokenStore::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(s) => Some(s.trim().to_string()).filter(|t| !t.is_empty()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    warn!("cannot read token file {}: {}", path.display(), e);
                    None
                }
            },
            TokenStore::Memory(m) => Self::slot(m).clone(),
        }
    }

    pub async fn save(&self, token: &str) -> anyhow::Result<()> {
        match self {
            TokenStore::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, token).await?;
            }
            TokenStore::Memory(m) => *Self::slot(m) = Some(token.to_string()),
        }
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        match self {
            TokenStore::File(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            TokenStore::Memory(m) => *Self::slot(m) = None,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug)]
pub struct AuthSession {
    store: TokenStore,
    current: Mutex<Option<Session>>,
}

impl AuthSession {
    pub fn new(store: TokenStore) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    // Never held across an await
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.lock().as_ref().map(|s| s.user.clone())
    }

    /// Re-verify a persisted token. Any failure, network included, discards
    /// it and leaves the session anonymous.
    pub async fn restore<A: EvidenceApi>(&self, api: &A) -> bool {
        let Some(token) = self.store.load().await else {
            return false;
        };
        match api.verify(&token).await {
            Ok(user) => {
                info!("restored session for {}", escape_log(&user.username));
                *self.lock() = Some(Session { token, user });
                true
            }
            Err(e) => {
                debug!("stored token {} discarded: {}", redact_token(&token), e);
                if let Err(e) = self.store.clear().await {
                    warn!("cannot clear token store: {}", e);
                }
                false
            }
        }
    }

    async fn establish(&self, grant: AuthGrant) -> UserProfile {
        if let Err(e) = self.store.save(&grant.token).await {
            // The session still works for this run
            warn!("cannot persist token: {}", e);
        }
        let user = grant.user.clone();
        *self.lock() = Some(Session {
            token: grant.token,
            user: grant.user,
        });
        user
    }

    pub async fn login<A: EvidenceApi>(
        &self,
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        let grant = api.login(username, password).await?;
        Ok(self.establish(grant).await)
    }

    pub async fn register<A: EvidenceApi>(
        &self,
        api: &A,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, ApiError> {
        let grant = api.register(username, password).await?;
        Ok(self.establish(grant).await)
    }

    /// Drop the session and token. Local only; returns whether a session existed.
    pub async fn logout(&self) -> bool {
        let had = self.lock().take().is_some();
        if let Err(e) = self.store.clear().await {
            warn!("cannot clear token store: {}", e);
        }
        had
    }

    /// Drop the session if it still holds `token`, after the server refused it.
    pub async fn invalidate(&self, token: &str) {
        let dropped = {
            let mut current = self.lock();
            if current.as_ref().is_some_and(|s| s.token == token) {
                *current = None;
                true
            } else {
                false
            }
        };
        if dropped {
            info!("session invalidated ({})", redact_token(token));
            if let Err(e) = self.store.clear().await {
                warn!("cannot clear token store: {}", e);
            }
        }
    }
}
