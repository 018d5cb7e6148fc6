//! # Configuration Management Module
//!
//! Centralized, TOML-backed configuration for both halves of caseterm: the
//! evidence service (`caseterm serve`) and the investigation console
//! (`caseterm terminal`).
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - HTTP bind address and reported environment
//! - [`AuthConfig`] - Bearer token signing secret and lifetime
//! - [`EvidenceConfig`] - The sealed secret released by the reveal endpoint
//! - [`ClientConfig`] - Console settings (service URL, token file, timeout)
//! - [`StorageConfig`] - Account store location
//! - [`LoggingConfig`] - Logging and security audit files
//! - [`SecurityConfig`] - Password hashing parameters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use caseterm::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Service bind: {}", config.server.bind);
//!     println!("Console target: {}", config.client.base_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3001"
//! environment = "development"
//!
//! [auth]
//! token_secret = "change-me"
//! token_ttl_hours = 24
//!
//! [client]
//! base_url = "http://127.0.0.1:3001"
//! token_file = ".caseterm_token"
//! timeout_seconds = 10
//! ```
//!
//! An empty `auth.token_secret` makes the service generate a random secret at
//! startup; tokens then stop verifying after a restart.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    pub client: ClientConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the evidence service listens on
    pub bind: String,
    /// Reported by `/health` as `environment`
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens. Empty means "generate at startup".
    #[serde(default)]
    pub token_secret: String,
    /// Token lifetime from issuance
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,
}

fn default_token_ttl_hours() -> u32 {
    24
}

/// Ten years
pub const MAX_TOKEN_TTL_HOURS: u32 = 87_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub secret_key: String,
    pub achievement: String,
    pub level: String,
    pub difficulty: String,
    pub hint: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            secret_key: "LEGAL_EVIDENCE_2024_CASE_FILES_RECOVERED".to_string(),
            achievement: "ELITE_DETECTIVE".to_string(),
            level: "MASTER_INVESTIGATOR".to_string(),
            difficulty: "EXPERT_LEVEL".to_string(),
            hint: "Justice prevails when dedicated detectives never give up on the truth :)"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the evidence service
    pub base_url: String,
    /// Where the console persists its bearer token between runs
    pub token_file: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

impl SecurityConfig {
    /// Resolve configured argon2 parameters, filling gaps from the library defaults.
    /// Returns `None` when nothing is configured or the combination is rejected.
    pub fn argon2_params(&self) -> Option<argon2::Params> {
        let a = self.argon2.as_ref()?;
        let builder = argon2::Params::DEFAULT;
        let mem = a.memory_kib.unwrap_or(builder.m_cost());
        let time = a.time_cost.unwrap_or(builder.t_cost());
        let para = a.parallelism.unwrap_or(builder.p_cost());
        argon2::Params::new(mem, time, para, None).ok()
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<()> {
        let ttl = self.auth.token_ttl_hours;
        if ttl == 0 || ttl > MAX_TOKEN_TTL_HOURS {
            return Err(anyhow!(
                "auth.token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                ttl
            ));
        }
        Ok(())
    }

    /// Create a default configuration file with a freshly generated token secret
    pub async fn create_default(path: &str) -> Result<()> {
        let mut config = Config::default();
        config.auth.token_secret = generate_secret();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

fn generate_secret() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind: "127.0.0.1:3001".to_string(),
                environment: default_environment(),
            },
            auth: AuthConfig {
                token_secret: String::new(),
                token_ttl_hours: default_token_ttl_hours(),
            },
            evidence: EvidenceConfig::default(),
            client: ClientConfig {
                base_url: "http://127.0.0.1:3001".to_string(),
                token_file: ".caseterm_token".to_string(),
                timeout_seconds: default_timeout_seconds(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("caseterm.log".to_string()),
                security_file: Some("caseterm-security.log".to_string()),
            },
            security: Some(SecurityConfig::default()),
        }
    }
}
