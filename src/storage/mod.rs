//! # Storage Module - Account Persistence
//!
//! File-backed account store used by the evidence service. It is the
//! user-lookup collaborator behind authentication and exposes three
//! operations: [`Storage::register`], [`Storage::authenticate`] and
//! [`Storage::find_by_id`].
//!
//! ## Layout
//!
//! ```text
//! data/
//! ├── users/   ← one JSON record per account, keyed by percent-encoded username
//! └── ids/     ← id → username pointers for token resolution
//! ```
//!
//! ## Uniqueness
//!
//! A new account record is written to a private temp file and then hard-linked
//! into place. The link fails if the name already exists, so two concurrent
//! registrations for the same username resolve to exactly one winner without
//! any in-process lock.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use caseterm::storage::Storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Storage::new("./data").await?;
//!     let account = storage.register("detective", "magnifier").await?;
//!     let same = storage.find_by_id(&account.id).await?;
//!     assert!(same.is_some());
//!     Ok(())
//! }
//! ```

use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::warn;
use password_hash::{PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::validation::{safe_filename, secure_json_parse};

const MAX_RECORD_BYTES: usize = 16_384;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("username '{0}' is already taken")]
    Duplicate(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Other(e.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Other(e.into())
    }
}

/// Persisted account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Main storage interface
pub struct Storage {
    data_dir: PathBuf,
    argon2: Argon2<'static>,
}

impl Storage {
    /// Initialize storage with the given data directory
    pub async fn new(data_dir: &str) -> anyhow::Result<Self> {
        Self::new_with_params(data_dir, None).await
    }

    /// Initialize storage with explicit Argon2 params
    pub async fn new_with_params(data_dir: &str, params: Option<Params>) -> anyhow::Result<Self> {
        let base = PathBuf::from(data_dir);
        fs::create_dir_all(base.join("users"))
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;
        fs::create_dir_all(base.join("ids")).await?;
        let argon2 = match params {
            Some(p) => Argon2::new(Algorithm::Argon2id, Version::V0x13, p),
            None => Argon2::default(),
        };
        Ok(Storage { data_dir: base, argon2 })
    }

    fn user_path(&self, username: &str) -> PathBuf {
        self.data_dir
            .join("users")
            .join(format!("{}.json", safe_filename(username)))
    }

    /// Create a new account. Credentials are expected to be validated already.
    ///
    /// Fails with [`StorageError::Duplicate`] when the username exists, including
    /// when another registration for the same name wins a race.
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, StorageError> {
        let path = self.user_path(username);
        if fs::try_exists(&path).await? {
            return Err(StorageError::Duplicate(username.to_string()));
        }

        let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hash failure: {e}"))?;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: hash.to_string(),
            created_at: Utc::now(),
            last_login: None,
        };
        let json = serde_json::to_string_pretty(&account)?;

        let tmp = Self::write_temp(&path, &json)?;
        let linked = std::fs::hard_link(&tmp, &path);
        let _ = std::fs::remove_file(&tmp);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Duplicate(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let id_path = self.data_dir.join("ids").join(&account.id);
        if let Err(e) = Self::write_file_locked(&id_path, &account.username) {
            // Without its id pointer the account could log in but never verify
            if let Err(rm) = std::fs::remove_file(&path) {
                warn!("Failed to roll back account record for {}: {}", account.id, rm);
            }
            return Err(e.into());
        }
        Ok(account)
    }

    /// Check a username/password pair. Unknown users and wrong passwords both
    /// yield `Ok(None)`; on success `last_login` is stamped and persisted.
    pub async fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<Account>> {
        let Some(mut account) = self.find_by_username(username).await? else {
            return Ok(None);
        };
        let parsed = password_hash::PasswordHash::new(&account.password_hash)
            .map_err(|e| anyhow!("Corrupt password hash: {e}"))?;
        if self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }
        account.last_login = Some(Utc::now());
        let json = serde_json::to_string_pretty(&account)?;
        if let Err(e) = Self::write_file_locked(&self.user_path(username), &json) {
            // A stale last_login must not block a valid login.
            warn!("Failed to record last_login for {}: {}", account.id, e);
        }
        Ok(Some(account))
    }

    /// Resolve an account by its id (the subject of a bearer token).
    pub async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Account>> {
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let id_path = self.data_dir.join("ids").join(id);
        let username = match fs::read_to_string(&id_path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(self
            .find_by_username(username.trim())
            .await?
            .filter(|a| a.id == id))
    }

    pub async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Account>> {
        let content = match fs::read_to_string(self.user_path(username)).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let account: Account = secure_json_parse(&content, MAX_RECORD_BYTES)
            .map_err(|e| anyhow!("Failed to parse account record: {}", e))?;
        Ok(Some(account))
    }

    /// Write `content` to a fresh temp file next to `path` and return its path.
    fn write_temp(path: &Path, content: &str) -> anyhow::Result<PathBuf> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path.file_name().and_then(|s| s.to_str()).unwrap_or("record");
        let mut counter = 0u32;
        loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(anyhow!("Failed to create temp file for atomic write: {}", e)),
            }
        }
    }

    /// Replace `path` atomically while holding an exclusive lock on it.
    fn write_file_locked(path: &Path, content: &str) -> anyhow::Result<()> {
        use std::fs::{File, OpenOptions};

        // fs2 locks are synchronous
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let tmp_path = Self::write_temp(path, content)?;
        std::fs::rename(&tmp_path, path)?;

        if let Some(dir) = path.parent() {
            if let Ok(dir_file) = File::open(dir) {
                let _ = dir_file.sync_all();
            }
        }
        drop(lock_file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fast_storage(dir: &Path) -> Storage {
        let params = Params::new(1024, 1, 1, None).ok();
        Storage::new_with_params(dir.to_str().unwrap(), params).await.unwrap()
    }

    #[tokio::test]
    async fn register_then_find_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = fast_storage(tmp.path()).await;
        let account = storage.register("holmes", "baker221").await.unwrap();
        let found = storage.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(found.username, "holmes");
        assert!(found.last_login.is_none());
        assert_ne!(found.password_hash, "baker221");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = fast_storage(tmp.path()).await;
        storage.register("holmes", "baker221").await.unwrap();
        let err = storage.register("holmes", "other-pass").await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(ref u) if u == "holmes"));
    }

    #[tokio::test]
    async fn authenticate_stamps_last_login() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = fast_storage(tmp.path()).await;
        storage.register("watson", "doctor1").await.unwrap();

        assert!(storage.authenticate("watson", "wrong-pass").await.unwrap().is_none());
        assert!(storage.authenticate("nobody", "doctor1").await.unwrap().is_none());

        let ok = storage.authenticate("watson", "doctor1").await.unwrap().unwrap();
        assert!(ok.last_login.is_some());
        let reread = storage.find_by_username("watson").await.unwrap().unwrap();
        assert_eq!(reread.last_login, ok.last_login);
    }

    #[tokio::test]
    async fn failed_id_pointer_releases_the_username() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = fast_storage(tmp.path()).await;
        let ids = tmp.path().join("ids");
        std::fs::remove_dir(&ids).unwrap();
        std::fs::write(&ids, b"not a directory").unwrap();

        let err = storage.register("lestrade", "yard1234").await.unwrap_err();
        assert!(matches!(err, StorageError::Other(_)));
        assert!(storage.find_by_username("lestrade").await.unwrap().is_none());

        std::fs::remove_file(&ids).unwrap();
        std::fs::create_dir(&ids).unwrap();
        let account = storage.register("lestrade", "yard1234").await.unwrap();
        assert!(storage.find_by_id(&account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_by_id_ignores_garbage_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = fast_storage(tmp.path()).await;
        assert!(storage.find_by_id("../users/x").await.unwrap().is_none());
        assert!(storage
            .find_by_id(&Uuid::new_v4().to_string())
            .await
            .unwrap()
            .is_none());
    }
}
