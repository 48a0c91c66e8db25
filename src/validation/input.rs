//! Input validation and sanitization utilities.
//!
//! Type names, field names and identities are checked before traversal so
//! that malformed models are rejected as a whole. Sanitization turns type
//! and field names into identifiers usable as table and column names.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Maximum length for type names
pub const MAX_TYPE_NAME_LENGTH: usize = 255;

/// Maximum length for field names
pub const MAX_FIELD_NAME_LENGTH: usize = 255;

/// Maximum length for object identities
pub const MAX_IDENTITY_LENGTH: usize = 1024;

static TYPE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_ .\-]*$").unwrap());

static INVALID_IDENTIFIER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_length(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Validate a type name.
///
/// # Rules
///
/// - Must not be empty or longer than 255 characters
/// - Must start with an ASCII letter or underscore
/// - May contain ASCII letters, digits, underscores, hyphens, dots and spaces
///
/// # Examples
///
/// ```
/// use object_model_converter::validation::input::validate_type_name;
///
/// assert!(validate_type_name("Team").is_ok());
/// assert!(validate_type_name("Team Member").is_ok());
/// assert!(validate_type_name("").is_err());
/// assert!(validate_type_name("9Lives").is_err());
/// ```
pub fn validate_type_name(name: &str) -> ValidationResult<()> {
    check_length("type name", name, MAX_TYPE_NAME_LENGTH)?;

    if !TYPE_NAME_REGEX.is_match(name) {
        return Err(ValidationError::InvalidFormat(
            "type name",
            format!(
                "'{}' must start with a letter or underscore and contain only letters, digits, '_', '-', '.' or spaces",
                name
            ),
        ));
    }
    Ok(())
}

/// Validate a field name.
///
/// Field names are free-form but must be non-empty and free of control
/// characters.
pub fn validate_field_name(name: &str) -> ValidationResult<()> {
    check_length("field name", name, MAX_FIELD_NAME_LENGTH)?;

    if let Some(c) = name.chars().find(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: "field name",
            reason: format!("control character U+{:04X}", c as u32),
        });
    }
    Ok(())
}

/// Validate an object identity.
pub fn validate_object_id(id: &str) -> ValidationResult<()> {
    check_length("object id", id, MAX_IDENTITY_LENGTH)?;

    if id.trim().is_empty() {
        return Err(ValidationError::Empty("object id"));
    }
    Ok(())
}

/// Sanitize a name for use as a table or column identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`; a leading digit gets
/// an underscore prefix.
///
/// # Examples
///
/// ```
/// use object_model_converter::validation::input::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("Team Member", false), "Team_Member");
/// assert_eq!(sanitize_identifier("Team Member", true), "team_member");
/// assert_eq!(sanitize_identifier("2nd-place", false), "_2nd_place");
/// ```
pub fn sanitize_identifier(name: &str, lowercase: bool) -> String {
    let mut sanitized = INVALID_IDENTIFIER_CHARS.replace_all(name, "_").into_owned();

    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    if lowercase {
        sanitized = sanitized.to_lowercase();
    }
    sanitized
}

/// First of `name`, `name_2`, `name_3`, ... that is not in `taken`.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use object_model_converter::validation::input::unique_identifier;
///
/// let taken: HashSet<String> = ["id".to_string(), "id_2".to_string()].into();
/// assert_eq!(unique_identifier("id", &taken), "id_3");
/// assert_eq!(unique_identifier("name", &taken), "name");
/// ```
pub fn unique_identifier(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", name, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Convert a type name to snake case (`TeamMember` -> `team_member`).
pub fn to_snake_case(name: &str) -> String {
    let sanitized = sanitize_identifier(name, false);
    let mut snake = String::with_capacity(sanitized.len() + 4);
    let mut prev: Option<char> = None;

    for c in sanitized.chars() {
        if c.is_ascii_uppercase() {
            if matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit()) {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
        prev = Some(c);
    }
    snake
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_type_name() {
        assert!(validate_type_name("Player").is_ok());
        assert!(validate_type_name("_Internal").is_ok());
        assert!(validate_type_name("geo.Point").is_ok());

        assert_eq!(validate_type_name(""), Err(ValidationError::Empty("type name")));
        assert!(validate_type_name("Team$").is_err());
        assert!(validate_type_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_field_name() {
        assert!(validate_field_name("first name").is_ok());
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("bad\nname").is_err());
    }

    #[test]
    fn test_validate_object_id() {
        assert!(validate_object_id("p1").is_ok());
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id("   ").is_err());
    }

    #[test]
    fn test_unique_identifier_skips_taken_suffixes() {
        let mut taken = HashSet::new();
        for _ in 0..3 {
            let name = unique_identifier("Team_Member", &taken);
            taken.insert(name);
        }
        assert!(taken.contains("Team_Member"));
        assert!(taken.contains("Team_Member_2"));
        assert!(taken.contains("Team_Member_3"));
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Team"), "team");
        assert_eq!(to_snake_case("TeamMember"), "team_member");
        assert_eq!(to_snake_case("Team Member"), "team_member");
        assert_eq!(to_snake_case("HTTPServer"), "httpserver");
    }
}
