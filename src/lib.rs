//! # caseterm - Investigation Console and Evidence Service
//!
//! caseterm is a text-command puzzle: a detective works through three gated
//! clues in a console, then asks a remote service for the sealed evidence.
//!
//! ## Features
//!
//! - **Command Interpreter**: fixed verb set (`help`, `status`, `whoami`, `case`,
//!   `decipher`, `repair`, `scan`, `login`, `register`, `logout`,
//!   `access-evidence`) dispatched through an enumerated [`terminal::Verb`].
//! - **Ordered Unlocks**: a per-context [`terminal::ProgressTracker`] with three
//!   monotonic flags.
//! - **Sessions**: bearer-token login/register/restore with an explicit
//!   [`terminal::TokenStore`] credential.
//! - **Evidence Service**: axum REST service with Argon2id account storage and
//!   HMAC-signed tokens expiring after 24 hours.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caseterm::client::LocalClient;
//! use caseterm::config::Config;
//! use caseterm::service::EvidenceService;
//! use caseterm::terminal::{execute, TerminalContext, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let service = Arc::new(EvidenceService::from_config(&config).await?);
//!     let ctx = TerminalContext::new(Arc::new(LocalClient::new(service)), TokenStore::memory());
//!
//!     if let Some(result) = execute("case", &ctx).await {
//!         for line in result.lines() {
//!             println!("{}", line);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`terminal`] - Interpreter, progress tracking, session and console
//! - [`client`] - HTTP and in-process clients for the service
//! - [`service`] - Evidence service core, tokens and wire types
//! - [`server`] - axum routes
//! - [`storage`] - Account persistence
//! - [`config`] - Configuration management
//! - [`validation`] - Credential checks and safe filenames
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Terminal     │ ← Interpreter, ProgressTracker, AuthSession
//! └─────────────────┘
//!          │ EvidenceApi (HTTP or local)
//! ┌─────────────────┐
//! │ EvidenceService │ ← Tokens, reveal, status
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Storage      │ ← Accounts
//! └─────────────────┘
//! ```
//!
//! The puzzle gates live only in the terminal. The service authorizes on the
//! bearer token alone.

pub mod client;
pub mod config;
pub mod logutil;
pub mod server;
pub mod service;
pub mod storage;
pub mod terminal;
pub mod validation;
