//! Binary entrypoint for the caseterm CLI.
//!
//! Commands:
//! - `serve [--bind <addr>]` - run the evidence service
//! - `terminal [--url <base>] [--local]` - open the investigation console
//! - `init` - write a starter `config.toml`
//!
//! See the library crate docs for module-level details: `caseterm::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use caseterm::client::{HttpClient, LocalClient};
use caseterm::config::Config;
use caseterm::service::EvidenceService;
use caseterm::terminal::{console, Terminal, TerminalContext, TokenStore};

#[derive(Parser)]
#[command(name = "caseterm")]
#[command(about = "Investigation console and evidence service for a three-clue puzzle")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the evidence service
    Serve {
        /// Listen address, overrides [server].bind
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Open the interactive investigation console
    Terminal {
        /// Service base URL, overrides [client].base_url
        #[arg(short, long)]
        url: Option<String>,

        /// Run against an in-process service instead of over HTTP
        #[arg(long)]
        local: bool,
    },
    /// Write a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing config file is fine outside `serve`; defaults apply
    let config = match cli.command {
        Commands::Init => None,
        _ => match Config::load(&cli.config).await {
            Ok(c) => Some(c),
            Err(e) => {
                if std::path::Path::new(&cli.config).exists() {
                    return Err(e);
                }
                None
            }
        },
    };

    match cli.command {
        Commands::Serve { bind } => {
            init_logging(&config, cli.verbose, true);
            let mut config = match config {
                Some(c) => c,
                None => {
                    warn!("{} not found; using built-in defaults", cli.config);
                    Config::default()
                }
            };
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!("Starting caseterm evidence service v{}", env!("CARGO_PKG_VERSION"));
            caseterm::server::run(&config).await?;
        }
        Commands::Terminal { url, local } => {
            // Console output belongs to the player; logs go to the file unless -v
            init_logging(&config, cli.verbose, cli.verbose > 0);
            let config = config.unwrap_or_default();
            let store = TokenStore::file(&config.client.token_file);
            if local {
                let service = Arc::new(EvidenceService::from_config(&config).await?);
                let api = Arc::new(LocalClient::new(service));
                let ctx = TerminalContext::restore(api, store).await;
                console::run(Arc::new(Terminal::new(Arc::new(ctx)))).await?;
            } else {
                let base = url.unwrap_or_else(|| config.client.base_url.clone());
                let api = Arc::new(HttpClient::new(
                    &base,
                    Duration::from_secs(config.client.timeout_seconds),
                )?);
                info!("Console using evidence service at {}", base);
                let ctx = TerminalContext::restore(api, store).await;
                console::run(Arc::new(Terminal::new(Arc::new(ctx)))).await?;
            }
        }
        Commands::Init => {
            init_logging(&None, cli.verbose, true);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8, console: bool) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only when attached to a terminal
            let echo = console && atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if record.target() == "security" {
                    if let Some(ref sec_path) = security_path {
                        if let Ok(mut sf) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(sec_path)
                        {
                            let _ = writeln!(sf, "{}", line);
                        }
                    }
                }

                if echo {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None if console => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
        None => {
            // No file and no console: keep only warnings and above
            builder.filter_level(log::LevelFilter::Warn);
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
