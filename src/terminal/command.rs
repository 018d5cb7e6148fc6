//! Parsed commands and the uniform result every handler returns.

use thiserror::Error;

use crate::client::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Help,
    Status,
    Whoami,
    Case,
    Decipher,
    Repair,
    Scan,
    Login,
    Register,
    Logout,
    AccessEvidence,
}

impl Verb {
    pub const ALL: [Verb; 11] = [
        Verb::Help,
        Verb::Status,
        Verb::Whoami,
        Verb::Case,
        Verb::Decipher,
        Verb::Repair,
        Verb::Scan,
        Verb::Login,
        Verb::Register,
        Verb::Logout,
        Verb::AccessEvidence,
    ];

    /// Match an already lower-cased word.
    pub fn from_word(word: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|v| v.as_str() == word)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Help => "help",
            Verb::Status => "status",
            Verb::Whoami => "whoami",
            Verb::Case => "case",
            Verb::Decipher => "decipher",
            Verb::Repair => "repair",
            Verb::Scan => "scan",
            Verb::Login => "login",
            Verb::Register => "register",
            Verb::Logout => "logout",
            Verb::AccessEvidence => "access-evidence",
        }
    }
}

/// A raw line split into a verb and positional arguments.
///
/// The whole line is lower-cased first, so arguments (passwords included)
/// are case-insensitive. There is no quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Command> {
        let lowered = raw.to_lowercase();
        let mut words = lowered.split_whitespace().map(str::to_string);
        let verb = words.next()?;
        Some(Command {
            verb,
            args: words.collect(),
        })
    }

    /// Arguments rejoined with single spaces.
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Echo of the submitted line
    Command,
    Response,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    /// Bad or missing arguments
    #[error("{0}")]
    Validation(String),
    /// Missing session, bad credentials or a rejected token
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Conflict(String),
    /// Command used out of unlock order
    #[error("{0}")]
    GateDenied(String),
    /// Network failure or a server-side fault
    #[error("{0}")]
    System(String),
}

impl From<ApiError> for TerminalError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Validation(m) => TerminalError::Validation(m),
            ApiError::Unauthorized(m) | ApiError::NotFound(m) => TerminalError::Auth(m),
            ApiError::Conflict(m) => TerminalError::Conflict(m),
            ApiError::Server(m) | ApiError::Network(m) => TerminalError::System(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub output: Vec<String>,
    pub error: Option<TerminalError>,
    pub kind: OutputKind,
}

impl CommandResult {
    pub fn ok(output: Vec<String>) -> Self {
        Self {
            success: true,
            output,
            error: None,
            kind: OutputKind::Response,
        }
    }

    pub fn fail(error: TerminalError) -> Self {
        Self {
            success: false,
            output: Vec::new(),
            error: Some(error),
            kind: OutputKind::Error,
        }
    }

    /// Lines to render: the output, or the single error line.
    pub fn lines(&self) -> Vec<String> {
        match &self.error {
            Some(e) => vec![e.to_string()],
            None => self.output.clone(),
        }
    }
}

impl From<Result<Vec<String>, TerminalError>> for CommandResult {
    fn from(r: Result<Vec<String>, TerminalError>) -> Self {
        match r {
            Ok(lines) => CommandResult::ok(lines),
            Err(e) => CommandResult::fail(e),
        }
    }
}
