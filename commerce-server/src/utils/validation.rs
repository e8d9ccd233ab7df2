//! Input validation helpers
//!
//! Centralized text length constants and validation functions. All
//! checks run before any side effect; failures are field-level
//! validation errors.

use crate::orders::error::ServiceError;

// ── Text length limits ──────────────────────────────────────────────

/// Names: recipients, payment methods, authors
pub const MAX_NAME_LEN: usize = 200;

/// Notes, reasons, comment bodies
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone numbers, region keys, discount codes
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit
pub fn validate_required_text(
    value: &str,
    field: &str,
    max_len: usize,
) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(field, "must not be empty"));
    }
    if value.len() > max_len {
        return Err(ServiceError::validation(
            field,
            format!("too long ({} chars, max {})", value.len(), max_len),
        ));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), ServiceError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(ServiceError::validation(
            field,
            format!("too long ({} chars, max {})", v.len(), max_len),
        ));
    }
    Ok(())
}
