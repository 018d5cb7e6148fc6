//! Verb handlers.
//!
//! [`execute`] parses a line and dispatches on [`Verb`], one handler per
//! variant. Handlers read and write only the [`TerminalContext`] they are
//! given and return `Result<Vec<String>, TerminalError>`; nothing escapes as
//! a panic or an `Err` past [`execute`].
//!
//! Gates:
//!
//! | verb | needs |
//! |---|---|
//! | `decipher` | session |
//! | `repair` | clue 1 |
//! | `scan` | clue 2 |
//! | `access-evidence` | session |
//!
//! `access-evidence` checks the session first and only then records clue 3,
//! so an anonymous attempt leaves progress untouched. It does not require
//! clue 2: the service would hand over the evidence to any token anyway.

use log::{debug, warn};

use super::command::{Command, CommandResult, TerminalError, Verb};
use super::progress::Stage;
use super::TerminalContext;
use crate::client::EvidenceApi;
use crate::logutil::mask_credentials;

pub const CIPHER_TEXT: &str = "ohjdo-ohjoh-2024";
/// The cipher text shifted back by three.
pub const CIPHER_ANSWER: &str = "legal-eagle-2024";
/// "7226" on a phone keypad.
pub const REPAIR_KEYWORD: &str = "scan";

const RULE: &str = "─────────────────────────";
const DOUBLE_RULE: &str = "═══════════════════════════════════════";

type Outcome = Result<Vec<String>, TerminalError>;

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

/// Run one raw line against `ctx`. Blank input is not a command: `None`.
pub async fn execute<A: EvidenceApi>(raw: &str, ctx: &TerminalContext<A>) -> Option<CommandResult> {
    let cmd = Command::parse(raw)?;
    debug!("execute: {}", mask_credentials(raw));
    let Some(verb) = Verb::from_word(&cmd.verb) else {
        return Some(CommandResult::fail(TerminalError::Validation(format!(
            "Unknown command: {}",
            cmd.verb
        ))));
    };
    let outcome = match verb {
        Verb::Help => Ok(help()),
        Verb::Status => status(ctx).await,
        Verb::Whoami => Ok(whoami(ctx)),
        Verb::Case => Ok(case_briefing()),
        Verb::Decipher => decipher(&cmd, ctx),
        Verb::Repair => repair(&cmd, ctx),
        Verb::Scan => scan(ctx),
        Verb::Login => login(&cmd, ctx).await,
        Verb::Register => register(&cmd, ctx).await,
        Verb::Logout => logout(ctx).await,
        Verb::AccessEvidence => access_evidence(ctx).await,
    };
    if let Err(TerminalError::System(msg)) = &outcome {
        warn!("{} failed: {}", verb.as_str(), msg);
    }
    Some(outcome.into())
}

fn help() -> Vec<String> {
    lines(&[
        "🕵️ LEGAL INVESTIGATION TERMINAL",
        DOUBLE_RULE,
        "         DETECTIVE COMMANDS",
        DOUBLE_RULE,
        "",
        "📋 BASIC OPERATIONS:",
        "  help              - Show this help menu",
        "  status            - Show system status",
        "  whoami            - Display current user info",
        "",
        "🔐 SECURITY ACCESS:",
        "  login <username> <password>    - Gain clearance",
        "  register <username> <password> - Create new agent profile",
        "  logout            - Revoke security clearance",
        "",
        "🔍 INVESTIGATION TOOLS:",
        "  case              - Get the current case briefing and clue",
        "  decipher <clue>   - Decipher a coded message",
        "  repair <code>     - Repair a corrupted command",
        "  scan              - Scan for system vulnerabilities",
        "",
        "💡 CASE BRIEFING:",
        "  The defense team needs your help!",
        "  Critical evidence files are hidden in this system.",
        "  Find all 3 clues to recover the files and save the case.",
        "",
        "🎯 CURRENT OBJECTIVE:",
        "  Use the \"case\" command to begin your investigation.",
        "",
        DOUBLE_RULE,
    ])
}

fn case_briefing() -> Vec<String> {
    vec![
        "=========================================================".to_string(),
        "                 HIDDEN_CLUE_1: Cipher Challenge".to_string(),
        "=========================================================".to_string(),
        String::new(),
        format!("Cipher: \"{}\"", CIPHER_TEXT),
        "Hint: Sometimes justice is just 3 steps back...".to_string(),
        String::new(),
        "Once deciphered, use the command: decipher <your-answer>".to_string(),
    ]
}

async fn status<A: EvidenceApi>(ctx: &TerminalContext<A>) -> Outcome {
    let health = ctx.api.health().await.map_err(|e| {
        debug!("health check failed: {}", e);
        TerminalError::System("Failed to retrieve system status".to_string())
    })?;

    let mut session = ctx.auth.current();
    let mut directive = None;
    if let Some(token) = session.as_ref().map(|s| s.token.clone()) {
        match ctx.api.case_status(&token).await {
            Ok(st) => directive = Some(st.hint),
            Err(e) if e.rejects_token() => {
                ctx.auth.invalidate(&token).await;
                session = None;
            }
            Err(e) => debug!("case status unavailable: {}", e),
        }
    }

    let progress = ctx.progress.snapshot();
    let mut out = vec![
        "🖥️  LEGAL INVESTIGATION STATUS".to_string(),
        RULE.to_string(),
        format!("System Status: {}", health.status.to_uppercase()),
        "Case: THE DEFENSE".to_string(),
        format!(
            "Investigation Progress: {}/3 CLUES FOUND",
            progress.clues_found()
        ),
        format!(
            "Authentication: {}",
            if session.is_some() { "ACTIVE" } else { "INACTIVE" }
        ),
        match &session {
            Some(s) => format!("Detective: {}", s.user.username),
            None => "Access Level: GUEST".to_string(),
        },
    ];
    if let Some(hint) = directive {
        out.push(format!("Directive: {}", hint));
    }
    out.push(RULE.to_string());
    out.push(if progress.stage() == Stage::Solved {
        "🎉 ALL EVIDENCE RECOVERED - CASE READY!".to_string()
    } else {
        "⚠️  EVIDENCE RECOVERY IN PROGRESS...".to_string()
    });
    Ok(out)
}

fn whoami<A: EvidenceApi>(ctx: &TerminalContext<A>) -> Vec<String> {
    match ctx.auth.user() {
        Some(user) => vec![
            "🕵️ DETECTIVE PROFILE".to_string(),
            "─────────────────".to_string(),
            format!("Detective ID: {}", user.username),
            format!("Badge Number: {}", user.id),
            format!("Assigned: {}", user.created_at.format("%Y-%m-%d")),
            "Clearance: AUTHORIZED ✅".to_string(),
            "Case: THE DEFENSE".to_string(),
            format!("Evidence Found: {}/3", ctx.progress.clues_found()),
        ],
        None => lines(&[
            "🕵️ DETECTIVE PROFILE",
            "─────────────────",
            "Status: UNAUTHORIZED",
            "Clearance Level: NONE",
            "Case Access: DENIED",
            "",
            "💡 Use \"login\" or \"register\" to join the investigation",
        ]),
    }
}

fn decipher<A: EvidenceApi>(cmd: &Command, ctx: &TerminalContext<A>) -> Outcome {
    if cmd.args.is_empty() {
        return Err(TerminalError::Validation("Usage: decipher <code>".to_string()));
    }
    if !ctx.auth.is_authenticated() {
        return Err(TerminalError::Auth(
            "ACCESS_DENIED: Detective authentication required for evidence access".to_string(),
        ));
    }
    if cmd.joined_args() != CIPHER_ANSWER {
        return Err(TerminalError::Validation(
            "CIPHER_ERROR: Invalid decryption key. Keep investigating...".to_string(),
        ));
    }
    ctx.progress.record_cipher();
    Ok(lines(&[
        "🔓 CIPHER DECODED SUCCESSFULLY!",
        RULE,
        "✅ CLUE 1/3 DISCOVERED",
        "",
        "📋 DECODED MESSAGE:",
        "\"The defense team needs access to encrypted files. A corrupted command was found in the system. Your next step is to repair the command.\"",
        "",
        "⚠️ ERROR: Corrupted command detected!",
        "\"oh looks like there's something wrong with the command...\"",
        "",
        "💡 HINT: The corrupted command is \"7226\". It is encrypted with a classic mobile keypad (T9) encryption.",
        "      7 = PQRS, 2 = ABC, 6 = MNO",
        "      Translate digits into letters to repair the command.",
        "",
        "🔧 FIX IT: Use the \"repair\" command to fix the corrupted command and reveal the next step.",
    ]))
}

fn repair<A: EvidenceApi>(cmd: &Command, ctx: &TerminalContext<A>) -> Outcome {
    if !ctx.progress.cipher_decoded() {
        return Err(TerminalError::GateDenied(
            "ACCESS_DENIED: Decipher the first clue to unlock this function.".to_string(),
        ));
    }
    if cmd.joined_args() != REPAIR_KEYWORD || !ctx.progress.record_repair() {
        return Err(TerminalError::Validation(
            "COMMAND_REPAIR_FAILED: The command could not be fixed. Check your logic and try again."
                .to_string(),
        ));
    }
    Ok(lines(&[
        "🛠️ COMMAND REPAIRED SUCCESSFULLY!",
        RULE,
        "✅ CLUE 2/3 DISCOVERED",
        "",
        "📋 NEXT STEP:",
        "\"Evidence files are stored in an encrypted partition. Use the \"scan\" command to locate them.\"",
        "",
        "🔍 NEXT STEP: Use the \"scan\" command to continue investigation",
        "",
        "💡 DETECTIVE TIP: The final clue requires system inspection after scanning.",
    ]))
}

fn scan<A: EvidenceApi>(ctx: &TerminalContext<A>) -> Outcome {
    if !ctx.progress.command_repaired() {
        return Err(TerminalError::GateDenied(
            "ACCESS_DENIED: Repair the corrupted command to unlock scan function".to_string(),
        ));
    }
    Ok(lines(&[
        "🔍 SYSTEM VULNERABILITY SCAN",
        "─────────────────",
        "Scanning system for security vulnerabilities...",
        "",
        "📊 SCAN RESULTS:",
        "• Encrypted partition detected: /evidence/sealed/ ⚠️",
        "• Concealed text found in the terminal banner 👁️",
        "• Interactive access points require investigation 🕵️",
        "• Authentication bypass patterns detected 🔓",
        "",
        "📋 SCAN ANALYSIS:",
        "\"Evidence files are stored in encrypted partition. The banner printed when this terminal started holds text your display does not show. Select or copy it to read the access command.\"",
        "",
        "🎯 FINAL STEP: Investigate the terminal banner carefully.",
        "Look for concealed text that might reveal",
        "the final access command needed to retrieve evidence.",
        "",
        "💡 DETECTIVE TIP: The final clue is hiding in plain sight. Check every corner!",
    ]))
}

/// `(username, password)` from the first two arguments.
fn credentials<'a>(cmd: &'a Command, usage: &str) -> Result<(&'a str, &'a str), TerminalError> {
    match cmd.args.as_slice() {
        [user, pass, ..] => Ok((user.as_str(), pass.as_str())),
        _ => Err(TerminalError::Validation(usage.to_string())),
    }
}

async fn login<A: EvidenceApi>(cmd: &Command, ctx: &TerminalContext<A>) -> Outcome {
    let (username, password) = credentials(cmd, "Usage: login <username> <password>")?;
    if let Some(user) = ctx.auth.user() {
        return Err(TerminalError::Validation(format!(
            "Already authenticated as Detective {}. Use \"logout\" first.",
            user.username
        )));
    }
    ctx.login(username, password).await?;
    Ok(vec![
        "🔓 DETECTIVE ACCESS GRANTED".to_string(),
        "─────────────────".to_string(),
        "✅ Authentication successful".to_string(),
        format!("Welcome, Detective {}!", username),
        "You now have access to the legal investigation system.".to_string(),
        String::new(),
        "🎯 MISSION BRIEFING:".to_string(),
        "The defense team needs your help! Critical evidence".to_string(),
        "files are hidden in this system. Your job is to find".to_string(),
        "all 3 clues to recover the files and save the case.".to_string(),
        String::new(),
        "💡 START HERE: Look around the terminal for hidden clues...".to_string(),
    ])
}

async fn register<A: EvidenceApi>(cmd: &Command, ctx: &TerminalContext<A>) -> Outcome {
    let (username, password) = credentials(cmd, "Usage: register <username> <password>")?;
    if ctx.auth.is_authenticated() {
        return Err(TerminalError::Validation(
            "Already authenticated as detective. Logout first to register new account.".to_string(),
        ));
    }
    ctx.register(username, password).await?;
    Ok(vec![
        "📝 DETECTIVE REGISTRATION COMPLETE".to_string(),
        RULE.to_string(),
        "✅ New detective account created".to_string(),
        format!("Detective ID: {}", username),
        "You are now authorized for the investigation.".to_string(),
        String::new(),
        "🎯 URGENT CASE ASSIGNMENT:".to_string(),
        "The defense team needs your immediate help!".to_string(),
        "Critical evidence files are hidden in this system.".to_string(),
        "Find all 3 clues to recover the files and save the case.".to_string(),
        String::new(),
        "💡 BEGIN INVESTIGATION: Use the \"case\" command for your first clue.".to_string(),
    ])
}

async fn logout<A: EvidenceApi>(ctx: &TerminalContext<A>) -> Outcome {
    if !ctx.logout().await {
        return Err(TerminalError::Auth(
            "Not currently authenticated as detective".to_string(),
        ));
    }
    Ok(lines(&[
        "🔒 DETECTIVE SESSION ENDED",
        "──────────────────",
        "✅ Authentication session terminated",
        "All case access permissions revoked.",
        "Investigation progress kept for this session.",
        "",
        "💡 Use \"login\" to resume your investigation",
    ]))
}

async fn access_evidence<A: EvidenceApi>(ctx: &TerminalContext<A>) -> Outcome {
    let Some(session) = ctx.auth.current() else {
        return Err(TerminalError::Auth(
            "ACCESS_DENIED: Detective authentication required for evidence access".to_string(),
        ));
    };
    ctx.progress.record_evidence();

    let secret = match ctx.api.reveal_secret(&session.token).await {
        Ok(secret) => secret,
        Err(e) if e.rejects_token() => {
            ctx.auth.invalidate(&session.token).await;
            return Err(TerminalError::Auth(e.to_string()));
        }
        Err(e) => {
            return Err(TerminalError::System(format!(
                "Failed to access evidence files: {}",
                e
            )))
        }
    };

    let info = &secret.additional_info;
    let mut out = vec![
        "🏆 CASE SOLVED! EVIDENCE RECOVERED! 🏆".to_string(),
        DOUBLE_RULE.to_string(),
        String::new(),
        "📁 CRITICAL EVIDENCE FILES ACCESSED:".to_string(),
        format!("🔑 Access Key: {}", secret.secret_key),
        String::new(),
        "🎖️  DETECTIVE ACHIEVEMENT:".to_string(),
        format!("     {}", secret.achievement),
        format!("     Rank: {}", secret.level),
        String::new(),
        "📊 INVESTIGATION SUMMARY:".to_string(),
        format!("   • Evidence Pieces: {}/3 ✅", info.clues_found),
        format!("   • Case Complexity: {}", info.difficulty),
        format!(
            "   • Solved: {}",
            secret.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        String::new(),
        "🛤️  INVESTIGATION PATHWAY:".to_string(),
    ];
    out.extend(
        info.total_steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("   {}. {} ✅", i + 1, step.replacen('_', " ", 1))),
    );
    out.extend([
        String::new(),
        "⚖️  LEGAL IMPACT:".to_string(),
        "The recovered evidence files contain crucial information".to_string(),
        "that will significantly strengthen the defense.".to_string(),
        "Your detective work has potentially saved the case".to_string(),
        "and ensured justice prevails!".to_string(),
        String::new(),
        "💭 DETECTIVE WISDOM:".to_string(),
        format!("     \"{}\"", info.hint),
        String::new(),
        DOUBLE_RULE.to_string(),
        "🎉 CONGRATULATIONS, DETECTIVE!".to_string(),
        "You have successfully recovered all evidence files".to_string(),
        "for the defense!".to_string(),
        String::new(),
        "The legal team can now proceed with confidence.".to_string(),
        "Justice will be served thanks to your skills!".to_string(),
        DOUBLE_RULE.to_string(),
    ]);
    Ok(out)
}
