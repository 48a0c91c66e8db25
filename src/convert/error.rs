//! Error types for object model conversion
//!
//! Entity-level errors (unresolved references, traversal bounds, schema
//! conflicts) are attached to the record that caused them and reported as
//! failed conversion results. The remaining variants abort the run.

use crate::models::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which traversal guard tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraversalLimit {
    Depth { max: usize },
    Records { max: usize },
}

impl fmt::Display for TraversalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalLimit::Depth { max } => write!(f, "depth limit {}", max),
            TraversalLimit::Records { max } => write!(f, "record limit {}", max),
        }
    }
}

/// Errors that can occur during conversion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// A reference points at an identity that is not part of the run
    #[error("Unresolved reference: {referrer}.{field} -> {target}")]
    UnresolvedReference {
        referrer: ObjectId,
        field: String,
        target: ObjectId,
    },

    /// The traversal guard stopped at this record
    #[error("Bounded traversal exceeded at {identity}: {limit}")]
    BoundedTraversalExceeded {
        identity: ObjectId,
        limit: TraversalLimit,
    },

    /// Two records of one type disagree on a field's shape or type
    #[error("Schema conflict on {type_name}.{field} ({identity}): expected {expected}, found {found}")]
    SchemaConflict {
        identity: ObjectId,
        type_name: String,
        field: String,
        expected: String,
        found: String,
    },

    /// Input rejected before traversal
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ConversionError {
    /// Entity-level kind, or `None` for run-level errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionError::UnresolvedReference { .. } => Some(ErrorKind::UnresolvedReference),
            ConversionError::BoundedTraversalExceeded { .. } => {
                Some(ErrorKind::BoundedTraversalExceeded)
            }
            ConversionError::SchemaConflict { .. } => Some(ErrorKind::SchemaConflict),
            _ => None,
        }
    }

    /// Identity of the record that caused an entity-level error
    pub fn culprit(&self) -> Option<&ObjectId> {
        match self {
            ConversionError::UnresolvedReference { referrer, .. } => Some(referrer),
            ConversionError::BoundedTraversalExceeded { identity, .. } => Some(identity),
            ConversionError::SchemaConflict { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(e: serde_json::Error) -> Self {
        ConversionError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConversionError {
    fn from(e: serde_yaml::Error) -> Self {
        ConversionError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(e: std::io::Error) -> Self {
        ConversionError::Io(e.to_string())
    }
}

/// Kind of a per-entity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "UnresolvedReferenceError")]
    UnresolvedReference,
    #[serde(rename = "BoundedTraversalExceeded")]
    BoundedTraversalExceeded,
    #[serde(rename = "SchemaConflictError")]
    SchemaConflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnresolvedReference => write!(f, "UnresolvedReferenceError"),
            ErrorKind::BoundedTraversalExceeded => write!(f, "BoundedTraversalExceeded"),
            ErrorKind::SchemaConflict => write!(f, "SchemaConflictError"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_errors_carry_culprit() {
        let err = ConversionError::UnresolvedReference {
            referrer: ObjectId::from("p3"),
            field: "team".to_string(),
            target: ObjectId::from("t9"),
        };
        assert_eq!(err.kind(), Some(ErrorKind::UnresolvedReference));
        assert_eq!(err.culprit().map(ObjectId::as_str), Some("p3"));
        assert_eq!(err.to_string(), "Unresolved reference: p3.team -> t9");
    }

    #[test]
    fn test_run_level_errors_have_no_kind() {
        let err = ConversionError::MalformedInput("no roots".to_string());
        assert!(err.kind().is_none());
        assert!(err.culprit().is_none());
    }

    #[test]
    fn test_kind_serializes_with_error_names() {
        let json = serde_json::to_string(&ErrorKind::SchemaConflict).unwrap();
        assert_eq!(json, "\"SchemaConflictError\"");
    }
}
