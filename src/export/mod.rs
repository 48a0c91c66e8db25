//! Export functionality
//!
//! Provides emitters for the three target representations:
//! - Document (nested JSON trees, one per root)
//! - Graph (labeled nodes and directed, attributed edges)
//! - Columnar (fixed-schema tables, foreign keys and junction tables)
//!
//! Emitters are pure functions over a resolved [`RecordArena`]; the
//! [`writer`] module persists their aggregated output.

pub mod columnar;
pub mod document;
pub mod graph;
pub mod writer;

use crate::models::{ConversionResult, EntityFailure, IntermediateRecord, RecordArena, TargetFormat};
use serde::Serialize;

/// Output of one emitter run
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOutput {
    /// One result per entity the emitter is responsible for
    pub results: Vec<ConversionResult>,
    /// Aggregated output of all successful entities
    pub output: TargetOutput,
}

/// Aggregated output for one target format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum TargetOutput {
    Document(DocumentSet),
    Graph(PropertyGraph),
    Columnar(ColumnarDataset),
}

impl TargetOutput {
    pub fn format(&self) -> TargetFormat {
        match self {
            TargetOutput::Document(_) => TargetFormat::Document,
            TargetOutput::Graph(_) => TargetFormat::Graph,
            TargetOutput::Columnar(_) => TargetFormat::Columnar,
        }
    }
}

/// Converts the resolved IR into one target representation
pub trait Emitter: Send + Sync {
    /// Target format produced by this emitter
    fn format(&self) -> TargetFormat;

    /// Emit every entity; per-entity failures are reported in the results
    fn emit(&self, arena: &RecordArena) -> EmitOutput;
}

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ExportError {
    fn from(err: serde_yaml::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

/// Failure description for a record that failed during reading or resolving
pub(crate) fn record_failure(record: &IntermediateRecord) -> Option<EntityFailure> {
    record
        .error()
        .and_then(|error| EntityFailure::from_error(error, &record.id))
}

pub use columnar::{Cell, ColumnType, ColumnarDataset, ColumnarEmitter, JunctionTable, Table};
pub use document::{DocumentEmitter, DocumentSet};
pub use graph::{GraphEmitter, PropertyGraph};
pub use writer::{OutputEncoding, OutputWriter, WrittenFile};
