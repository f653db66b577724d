//! Identifier helpers.
//!
//! Identifiers are plain strings restricted to characters that are safe in
//! file names and simulation engine inputs.

use crate::error::DragonflyError;
use anyhow::Result;
use uuid::Uuid;

const MAX_ID_LENGTH: usize = 100;

/// Returns a random UUID
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns 8 random hex characters.
pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty() && value.len() <= MAX_ID_LENGTH && value.chars().all(is_valid_char)
}

/// Checks an identifier and returns it unchanged, or fails with `InvalidInput`.
pub fn valid_identifier(value: &str) -> Result<String> {
    if is_valid_identifier(value) {
        Ok(value.to_string())
    } else {
        Err(DragonflyError::InvalidInput(format!(
            "\"{}\" is not a valid identifier. Use up to {} letters, digits, '_', '-' or '.'",
            value, MAX_ID_LENGTH
        ))
        .into())
    }
}

/// Replaces illegal characters with underscores and trims to the maximum length.
pub fn clean_string(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if is_valid_char(c) { c } else { '_' })
        .collect();
    let cleaned = if cleaned.is_empty() { "Unnamed".to_string() } else { cleaned };
    cleaned.chars().take(MAX_ID_LENGTH).collect()
}

/// Cleans a display name and appends a random suffix so that it is unique.
pub fn clean_and_id_string(value: &str) -> String {
    let suffix = short_id();
    let base: String = clean_string(value)
        .chars()
        .take(MAX_ID_LENGTH - suffix.len() - 1)
        .collect();
    format!("{}_{}", base, suffix)
}
