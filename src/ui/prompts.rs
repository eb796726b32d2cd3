//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have a flag or fail
//! with a clear error message.

use std::io::{self, BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Prompt for confirmation (yes/no).
///
/// An empty answer picks `default`.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {} ", message, hint);
    io::stdout()
        .flush()
        .map_err(|e| PromptError::IoError(e.to_string()))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| PromptError::IoError(e.to_string()))?;

    Ok(parse_answer(&answer, default))
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Prompt for masked input (e.g., tokens).
///
/// The input is not echoed to the terminal.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }

    rpassword::prompt_password(format!("{}: ", message))
        .map(|s| s.trim().to_string())
        .map_err(|e| PromptError::IoError(e.to_string()))
}
