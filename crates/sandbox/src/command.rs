// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch command templates.
//!
//! A template is split into argv with shell-like quoting (no expansion, no
//! operators), then each token gets its placeholders replaced.

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Placeholder for the image the VM boots.
pub const IMAGENAME: &str = "IMAGENAME";
/// Placeholder for the forwarded SSH port.
pub const SSHPORT: &str = "SSHPORT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,
    #[error("unterminated single quote")]
    UnterminatedSingleQuote,
    #[error("unterminated double quote")]
    UnterminatedDoubleQuote,
    #[error("trailing backslash")]
    TrailingBackslash,
}

/// Split a command line into arguments.
///
/// Whitespace separates words. Single quotes preserve everything up to the
/// closing quote. Inside double quotes a backslash escapes only `\`, `"`,
/// `$`, `` ` `` and newline. Outside quotes a backslash escapes any
/// character; an escaped newline is dropped.
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut chars = line.chars().peekable();
    let mut words = Vec::new();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }
        words.push(word(&mut chars)?);
    }

    if words.is_empty() {
        return Err(CommandError::Empty);
    }
    Ok(words)
}

fn word(chars: &mut Peekable<Chars<'_>>) -> Result<String, CommandError> {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        chars.next();
        match ch {
            '\'' => single_quoted(chars, &mut word)?,
            '"' => double_quoted(chars, &mut word)?,
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(escaped) => word.push(escaped),
                None => return Err(CommandError::TrailingBackslash),
            },
            _ => word.push(ch),
        }
    }
    Ok(word)
}

fn single_quoted(chars: &mut Peekable<Chars<'_>>, word: &mut String) -> Result<(), CommandError> {
    for ch in chars.by_ref() {
        if ch == '\'' {
            return Ok(());
        }
        word.push(ch);
    }
    Err(CommandError::UnterminatedSingleQuote)
}

fn double_quoted(chars: &mut Peekable<Chars<'_>>, word: &mut String) -> Result<(), CommandError> {
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return Ok(()),
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(escaped @ ('\\' | '"' | '$' | '`')) => word.push(escaped),
                Some(other) => {
                    word.push('\\');
                    word.push(other);
                }
                None => return Err(CommandError::UnterminatedDoubleQuote),
            },
            _ => word.push(ch),
        }
    }
    Err(CommandError::UnterminatedDoubleQuote)
}

/// Replace [`IMAGENAME`] and [`SSHPORT`] in every token.
pub fn substitute(tokens: &[String], image: &str, ssh_port: u16) -> Vec<String> {
    let port = ssh_port.to_string();
    tokens.iter().map(|t| t.replace(IMAGENAME, image).replace(SSHPORT, &port)).collect()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
