//! Per-entity conversion results

use super::value::ObjectId;
use crate::convert::{ConversionError, ErrorKind};
use crate::export::columnar::Cell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Target representation requested from the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Document,
    Graph,
    Columnar,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [
        TargetFormat::Document,
        TargetFormat::Graph,
        TargetFormat::Columnar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Document => "document",
            TargetFormat::Graph => "graph",
            TargetFormat::Columnar => "columnar",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "documents" | "doc" => Ok(TargetFormat::Document),
            "graph" | "property-graph" => Ok(TargetFormat::Graph),
            "columnar" | "table" | "tables" => Ok(TargetFormat::Columnar),
            other => Err(ConversionError::MalformedInput(format!(
                "Unknown target format: {}",
                other
            ))),
        }
    }
}

/// Node of a property graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: ObjectId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Directed, labeled edge of a property graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: uuid::Uuid,
    pub source: ObjectId,
    pub target: ObjectId,
    pub label: String,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Graph output attributable to one record: its node and outgoing edges
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphFragment {
    pub node: GraphNode,
    pub edges: Vec<GraphEdge>,
}

/// Row of a junction table produced by one source record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionRow {
    pub table: String,
    pub source: ObjectId,
    pub target: ObjectId,
}

/// Columnar output attributable to one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFragment {
    pub table: String,
    pub row: Vec<Cell>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub junction_rows: Vec<JunctionRow>,
}

/// Successful output for one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Payload {
    Document(serde_json::Value),
    Graph(GraphFragment),
    Columnar(RowFragment),
}

/// Why an entity could not be converted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub kind: ErrorKind,
    pub culprit: ObjectId,
    pub message: String,
}

impl EntityFailure {
    /// Build from an entity-level error; `fallback` names the culprit when
    /// the error carries none
    pub fn from_error(error: &ConversionError, fallback: &ObjectId) -> Option<Self> {
        let kind = error.kind()?;
        Some(Self {
            kind,
            culprit: error.culprit().unwrap_or(fallback).clone(),
            message: error.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionOutcome {
    Success(Payload),
    Failure(EntityFailure),
}

/// Outcome of converting one entity into one target format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub identity: ObjectId,
    pub format: TargetFormat,
    pub outcome: ConversionOutcome,
}

impl ConversionResult {
    pub fn success(identity: ObjectId, format: TargetFormat, payload: Payload) -> Self {
        Self {
            identity,
            format,
            outcome: ConversionOutcome::Success(payload),
        }
    }

    pub fn failure(identity: ObjectId, format: TargetFormat, failure: EntityFailure) -> Self {
        Self {
            identity,
            format,
            outcome: ConversionOutcome::Failure(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ConversionOutcome::Success(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.outcome {
            ConversionOutcome::Success(payload) => Some(payload),
            ConversionOutcome::Failure(_) => None,
        }
    }

    pub fn failure_info(&self) -> Option<&EntityFailure> {
        match &self.outcome {
            ConversionOutcome::Failure(failure) => Some(failure),
            ConversionOutcome::Success(_) => None,
        }
    }
}
