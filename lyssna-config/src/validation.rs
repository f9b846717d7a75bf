// lyssna-config/src/validation.rs
//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration modules.

use validator::ValidationError;

/// Validate that an interface name is something a capture engine can open.
///
/// Linux caps names at 15 bytes; dots and dashes show up in VLAN and
/// bridge names (`eth0.100`, `br-lan`).
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[a-zA-Z0-9_.-]+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;

    if name.len() <= 15 && re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate a filter expression before it ever reaches the compiler.
///
/// Syntax is the compiler's job; this only rejects what cannot be passed
/// across the C boundary at all.
pub fn validate_filter_expression(expression: &str) -> Result<(), ValidationError> {
    if expression.trim().is_empty() {
        return Err(ValidationError::new("empty_filter"));
    }
    if expression.contains('\0') {
        return Err(ValidationError::new("filter_contains_nul"));
    }
    Ok(())
}

/// Validate a tracing filter directive such as `info` or `lyssna_capture=debug`.
pub fn validate_log_filter(directive: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9_:=,\-\[\]{}. ]+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(directive) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
