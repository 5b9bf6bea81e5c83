use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, warn};

use super::App;
use crate::cli::Invocation;
use crate::config::Config;
use crate::storage::Storage;

const PROMPT: &str = "taskgate> ";

/// Reads commands line by line until `quit`, `exit` or end of input. One
/// `App` lives for the whole session, so notices carry across commands.
pub fn run_shell<S, W, R>(app: &mut App<'_, S, W>, cfg: &Config, mut input: R) -> anyhow::Result<()>
where
    S: Storage,
    W: Write,
    R: BufRead,
{
    loop {
        app.renderer_mut().prompt(PROMPT)?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            app.renderer_mut().line("")?;
            break;
        }

        let tokens = match split_line(&line) {
            Ok(tokens) => tokens,
            Err(err) => {
                app.renderer_mut().line(&format!("{err}"))?;
                continue;
            }
        };
        match tokens.first().map(String::as_str) {
            None => continue,
            Some("quit" | "exit") => break,
            _ => {}
        }

        let inv = match Invocation::from_tokens(cfg, &tokens) {
            Ok(inv) => inv,
            Err(err) => {
                app.renderer_mut().line(&format!("{err}"))?;
                continue;
            }
        };
        if inv.command == "shell" {
            app.renderer_mut().line("already in the shell")?;
            continue;
        }

        match app.dispatch(&inv, Utc::now(), Instant::now()) {
            Ok(outcome) => debug!(?outcome, "shell command finished"),
            Err(err) => {
                warn!(error = %err, "shell command failed");
                app.renderer_mut().line(&format!("error: {err:#}"))?;
            }
        }
    }

    Ok(())
}

/// Whitespace-separated words; single or double quotes group a phrase.
fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(anyhow!("unterminated quote"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
