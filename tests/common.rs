//! Shared fixtures: an in-process evidence service on a temp data dir.

use std::sync::Arc;

use caseterm::client::LocalClient;
use caseterm::config::EvidenceConfig;
use caseterm::service::token::TokenSigner;
use caseterm::service::EvidenceService;
use caseterm::storage::Storage;
use caseterm::terminal::{TerminalContext, TokenStore};
use chrono::Duration;
use tempfile::TempDir;

pub const SIGNING_KEY: &[u8] = b"integration-secret";

/// Service with cheap argon2 parameters. Keep the `TempDir` alive.
pub async fn service() -> (TempDir, Arc<EvidenceService>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service_in(&tmp, SIGNING_KEY).await;
    (tmp, svc)
}

pub async fn service_in(dir: &TempDir, key: &[u8]) -> Arc<EvidenceService> {
    let params = argon2::Params::new(1024, 1, 1, None).ok();
    let storage = Storage::new_with_params(dir.path().to_str().unwrap(), params)
        .await
        .expect("storage");
    Arc::new(EvidenceService::new(
        storage,
        TokenSigner::new(key, Duration::hours(24)),
        EvidenceConfig::default(),
        "test",
    ))
}

#[allow(dead_code)] // not every test binary needs a console context
pub fn context(svc: &Arc<EvidenceService>) -> TerminalContext<LocalClient> {
    TerminalContext::new(Arc::new(LocalClient::new(Arc::clone(svc))), TokenStore::memory())
}
