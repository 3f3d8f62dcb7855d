use anyhow::{anyhow, Result};
use std::path::Path;

/// Largest accepted ingest batch
pub const MAX_BATCH_SIZE: usize = 100_000;

/// Strip the formatting people type into phone numbers.
///
/// Spaces, parentheses and dashes are removed; email addresses pass through
/// unchanged apart from surrounding whitespace.
#[must_use]
pub fn normalize_contact_identifier(identifier: &str) -> String {
    identifier
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '-'))
        .collect()
}

/// Validation utilities for command-line and configuration input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a contact identifier: a phone number or an email address
    pub fn validate_contact_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(anyhow!("Contact identifier cannot be empty"));
        }

        if identifier.contains('\0') || identifier.contains('\r') || identifier.contains('\n') {
            return Err(anyhow!("Contact identifier contains invalid characters"));
        }

        if identifier.contains('@') {
            Self::validate_email(identifier)
        } else {
            Self::validate_phone(identifier)
        }
    }

    /// Validate phone number format
    pub fn validate_phone(phone: &str) -> Result<()> {
        if phone.trim().is_empty() {
            return Err(anyhow!("Phone number cannot be empty"));
        }

        let cleaned = normalize_contact_identifier(phone);
        let digits = cleaned.chars().filter(char::is_ascii_digit).count();

        if !(7..=15).contains(&digits) {
            return Err(anyhow!("Phone number must be between 7 and 15 digits"));
        }

        let body = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if !body.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!(
                "Phone number may only contain digits, an optional leading +, spaces, dashes and parentheses"
            ));
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(anyhow!("Email cannot be empty"));
        }

        if email.len() > 254 {
            return Err(anyhow!("Email too long (max 254 characters)"));
        }

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return Err(anyhow!("Email must contain @ symbol"));
        };

        if domain_part.contains('@') {
            return Err(anyhow!("Email must have exactly one @ symbol"));
        }

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(anyhow!("Email local part invalid"));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(anyhow!("Email domain invalid"));
        }

        Ok(())
    }

    /// Validate a report output path
    pub fn validate_output_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(anyhow!("Output path cannot be empty"));
        }

        if path_str.contains("..") {
            return Err(anyhow!("Output path must not contain parent-directory segments"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("Output path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate ingest batch size
    pub fn validate_batch_size(batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be greater than 0"));
        }

        if batch_size > MAX_BATCH_SIZE {
            return Err(anyhow!("Batch size too large (max {MAX_BATCH_SIZE})"));
        }

        Ok(())
    }

    /// Validate the Messages database path
    pub fn validate_imessage_db_path(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(anyhow!("iMessage database path does not exist: {path:?}"));
        }

        if !path.is_file() {
            return Err(anyhow!("iMessage database path is not a file: {path:?}"));
        }

        std::fs::metadata(path).map_err(|e| anyhow!("Cannot access iMessage database: {e}"))?;

        Ok(())
    }
}
