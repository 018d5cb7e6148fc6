//! Interactive rustyline front end.
//!
//! Every submitted line runs as its own task, so a slow network command does
//! not block the prompt; results print as they complete.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::task::JoinSet;

use super::{CommandResult, OutputKind, Terminal, Verb};
use crate::client::EvidenceApi;

struct ConsoleHelper;

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = Verb::ALL
            .iter()
            .map(Verb::as_str)
            .filter(|w| w.starts_with(&line.to_lowercase()))
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let first = line.split_whitespace().next().unwrap_or("");
        if Verb::from_word(&first.to_lowercase()).is_some() {
            Owned(line.bright_green().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        Verb::ALL
            .iter()
            .map(Verb::as_str)
            .find(|w| w.starts_with(line) && w.len() > line.len())
            .map(|w| w[line.len()..].to_string())
    }
}

impl Validator for ConsoleHelper {}

fn banner(authenticated_as: Option<String>) {
    println!("{}", "=== LEGAL INVESTIGATION TERMINAL ===".bright_green().bold());
    println!("{}", "Secure evidence recovery console".green());
    // Concealed: only visible when copied out of the terminal
    println!("{}", "Execute: access-evidence".hidden());
    match authenticated_as {
        Some(name) => println!("{}", format!("Session restored: Detective {}", name).bright_black()),
        None => println!("{}", "Type 'help' for commands, 'quit' to exit.".bright_black()),
    }
    println!();
}

fn render(result: &CommandResult) {
    for line in result.lines() {
        match result.kind {
            OutputKind::Error => println!("{}", line.red()),
            OutputKind::Command => println!("{}", line.bright_black()),
            OutputKind::Response => println!("{}", line.green()),
        }
    }
}

/// Read lines until `quit`/`exit` or EOF, then wait for commands in flight.
pub async fn run<A: EvidenceApi + 'static>(terminal: Arc<Terminal<A>>) -> anyhow::Result<()> {
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ConsoleHelper));

    banner(terminal.context().auth.user().map(|u| u.username));

    let mut in_flight = JoinSet::new();
    loop {
        reap_finished(&mut in_flight);
        match rl.readline("detective> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                    println!("{}", "Case file closed.".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let term = Arc::clone(&terminal);
                let input = trimmed.to_string();
                in_flight.spawn(async move {
                    if let Some(result) = term.submit(&input).await {
                        render(&result);
                    }
                });
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    Ok(())
}

/// Drop the handles of commands that already completed; returns how many.
fn reap_finished(in_flight: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while in_flight.try_join_next().is_some() {
        reaped += 1;
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn finished_commands_are_reaped() {
        let mut in_flight = JoinSet::new();
        for _ in 0..3 {
            in_flight.spawn(async {});
        }
        in_flight.spawn(tokio::time::sleep(Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(reap_finished(&mut in_flight), 3);
        assert_eq!(in_flight.len(), 1);
        assert_eq!(reap_finished(&mut in_flight), 0);
        in_flight.abort_all();
    }
}
