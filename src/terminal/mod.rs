//! # Investigation Console
//!
//! The client half of caseterm: a command interpreter driving the three-clue
//! unlock puzzle against the evidence service.
//!
//! ```text
//! raw line -> Command::parse -> Verb handler -> (ProgressTracker gate)
//!          -> (optional EvidenceApi call) -> CommandResult -> transcript
//! ```
//!
//! All mutable state lives in a [`TerminalContext`]: the [`AuthSession`] and
//! the [`ProgressTracker`]. Nothing is global, so any number of contexts can
//! run side by side without seeing each other's progress.
//!
//! The clue gates are presentation only. The service releases the evidence to
//! any valid token; see [`crate::service`].

pub mod auth;
pub mod command;
pub mod console;
pub mod interpreter;
pub mod progress;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::EvidenceApi;
use crate::logutil::mask_credentials;
pub use auth::{AuthSession, Session, TokenStore};
pub use command::{Command, CommandResult, OutputKind, TerminalError, Verb};
pub use interpreter::execute;
pub use progress::{ProgressState, ProgressTracker, Stage};

/// Per-player state plus the service client it talks to.
pub struct TerminalContext<A> {
    pub api: Arc<A>,
    pub auth: AuthSession,
    pub progress: ProgressTracker,
}

impl<A: EvidenceApi> TerminalContext<A> {
    pub fn new(api: Arc<A>, store: TokenStore) -> Self {
        Self {
            api,
            auth: AuthSession::new(store),
            progress: ProgressTracker::new(),
        }
    }

    /// New context that first tries to resume a persisted token.
    pub async fn restore(api: Arc<A>, store: TokenStore) -> Self {
        let ctx = Self::new(api, store);
        ctx.auth.restore(ctx.api.as_ref()).await;
        ctx
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), TerminalError> {
        self.auth.login(self.api.as_ref(), username, password).await?;
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), TerminalError> {
        self.auth
            .register(self.api.as_ref(), username, password)
            .await?;
        Ok(())
    }

    pub async fn logout(&self) -> bool {
        self.auth.logout().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub content: String,
    pub kind: OutputKind,
}

/// A context plus the running transcript of what was printed.
///
/// The echo of a line is appended on submission and its result on completion,
/// so two overlapping commands print in the order they finish.
pub struct Terminal<A> {
    ctx: Arc<TerminalContext<A>>,
    transcript: Mutex<Vec<OutputLine>>,
}

impl<A: EvidenceApi> Terminal<A> {
    pub fn new(ctx: Arc<TerminalContext<A>>) -> Self {
        Self {
            ctx,
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &Arc<TerminalContext<A>> {
        &self.ctx
    }

    fn push(&self, lines: impl IntoIterator<Item = OutputLine>) {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(lines);
    }

    /// Run one line. Blank input is ignored and returns `None`.
    pub async fn submit(&self, raw: &str) -> Option<CommandResult> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        self.push([OutputLine {
            content: format!("$ {}", mask_credentials(line)),
            kind: OutputKind::Command,
        }]);
        let result = execute(line, self.ctx.as_ref()).await?;
        self.push(result.lines().into_iter().map(|content| OutputLine {
            content,
            kind: result.kind,
        }));
        Some(result)
    }

    pub fn transcript(&self) -> Vec<OutputLine> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
