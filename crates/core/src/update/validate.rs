// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field validators shared by the update constructors.

use super::UpdateError;

/// Printable means no control characters and no whitespace other than the
/// plain ASCII space.
pub(crate) fn is_printable(s: &str) -> bool {
    s.chars().all(|c| !c.is_control() && (c == ' ' || !c.is_whitespace()))
}

/// Identifier-like token: a letter or underscore followed by letters,
/// digits, or underscores.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

pub(crate) fn printable(field: &'static str, value: &str) -> Result<(), UpdateError> {
    if is_printable(value) {
        Ok(())
    } else {
        Err(UpdateError::NotPrintable { field, value: value.to_string() })
    }
}

pub(crate) fn time(field: &'static str, value: f64) -> Result<(), UpdateError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(UpdateError::InvalidTime { field, value })
    }
}

pub(crate) fn job_name(value: &str) -> Result<(), UpdateError> {
    if value.is_empty() {
        return Err(UpdateError::InvalidJobName(value.to_string()));
    }
    if !is_printable(value) || value.contains(&['/', '\\'][..]) {
        return Err(UpdateError::InvalidJobName(value.to_string()));
    }
    Ok(())
}

pub(crate) fn step_name(value: &str) -> Result<(), UpdateError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(UpdateError::InvalidStepName(value.to_string()))
    }
}

pub(crate) fn output_name(value: &str) -> Result<(), UpdateError> {
    let reason = match value.chars().next() {
        None => "must not be empty",
        Some(c) if !c.is_alphabetic() => "must start with a letter",
        Some(_) if !is_printable(value) || value.contains(&['/', '\\', '\'', '"'][..]) => {
            "contains illegal characters"
        }
        Some(_) => return Ok(()),
    };
    Err(UpdateError::InvalidOutputName { name: value.to_string(), reason })
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
