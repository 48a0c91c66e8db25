//! Validation functionality
//!
//! Provides validation logic for:
//! - Type names, field names and identities of source objects
//! - Identifier sanitization for columnar table and column names

pub mod input;

pub use input::{
    ValidationError, ValidationResult, sanitize_identifier, to_snake_case, unique_identifier,
    validate_field_name, validate_object_id, validate_type_name,
};
