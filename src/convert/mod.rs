//! Conversion driver
//!
//! Runs the reader and resolver once, then every requested emitter over the
//! shared read-only IR. Emitters run in parallel; their per-entity results
//! are aggregated into one [`ConversionReport`].

pub mod config;
pub mod error;

pub use config::{
    ColumnarOptions, ConversionOptions, ConversionOptionsBuilder, DocumentOptions, EdgeLabelStyle,
    GraphOptions, NullPolicy, ResolverOptions, TraversalOptions, UnresolvedPolicy,
};
pub use error::{ConversionError, ErrorKind, TraversalLimit};

use crate::export::{
    ColumnarDataset, ColumnarEmitter, DocumentEmitter, DocumentSet, EmitOutput, Emitter,
    GraphEmitter, PropertyGraph, TargetOutput,
};
use crate::models::{ConversionResult, ObjectId, ObjectModel, RecordArena, TargetFormat};
use crate::reader::ObjectReader;
use crate::resolver::{ReferenceResolver, ResolveStats};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Success and failure counts for one format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatStats {
    pub succeeded: usize,
    pub failed: usize,
}

/// Statistics of one conversion run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub roots: usize,
    pub records: usize,
    pub edges: usize,
    pub stubs: usize,
    /// Records that failed while reading or resolving
    pub failed_records: usize,
    pub resolution: ResolveStats,
    pub formats: BTreeMap<TargetFormat, FormatStats>,
    pub duration_ms: u64,
}

/// Everything produced by one conversion run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    /// Per-entity results, grouped by format in request order
    pub results: Vec<ConversionResult>,
    pub outputs: BTreeMap<TargetFormat, TargetOutput>,
    pub stats: ConversionStats,
    /// Hex SHA-256 of the serialized outputs
    pub digest: String,
}

impl ConversionReport {
    pub fn results_for(&self, format: TargetFormat) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(move |r| r.format == format)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn is_complete_success(&self) -> bool {
        self.results.iter().all(ConversionResult::is_success)
    }

    pub fn output(&self, format: TargetFormat) -> Option<&TargetOutput> {
        self.outputs.get(&format)
    }

    pub fn documents(&self) -> Option<&DocumentSet> {
        match self.outputs.get(&TargetFormat::Document) {
            Some(TargetOutput::Document(documents)) => Some(documents),
            _ => None,
        }
    }

    pub fn graph(&self) -> Option<&PropertyGraph> {
        match self.outputs.get(&TargetFormat::Graph) {
            Some(TargetOutput::Graph(graph)) => Some(graph),
            _ => None,
        }
    }

    pub fn columnar(&self) -> Option<&ColumnarDataset> {
        match self.outputs.get(&TargetFormat::Columnar) {
            Some(TargetOutput::Columnar(dataset)) => Some(dataset),
            _ => None,
        }
    }
}

/// Conversion entry point
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    fn emitter(&self, format: TargetFormat) -> Box<dyn Emitter> {
        match format {
            TargetFormat::Document => Box::new(DocumentEmitter::new(self.options.document.clone())),
            TargetFormat::Graph => Box::new(GraphEmitter::new(self.options.graph.clone())),
            TargetFormat::Columnar => Box::new(ColumnarEmitter::new(self.options.columnar.clone())),
        }
    }

    /// Read and resolve `model` from `roots` without emitting
    pub fn prepare(
        &self,
        model: &ObjectModel,
        roots: &[ObjectId],
    ) -> Result<(RecordArena, ResolveStats), ConversionError> {
        let mut arena = ObjectReader::new(self.options.traversal.clone()).read(model, roots)?;
        let stats = ReferenceResolver::new(self.options.resolver.clone()).resolve(&mut arena);
        Ok((arena, stats))
    }

    /// Convert `model` into every format in `formats`.
    ///
    /// Fails only on malformed input; per-entity problems are reported as
    /// failed results in the returned report.
    pub fn convert(
        &self,
        model: &ObjectModel,
        roots: &[ObjectId],
        formats: &[TargetFormat],
    ) -> Result<ConversionReport, ConversionError> {
        let _span = info_span!(
            "conversion_run",
            roots = roots.len(),
            objects = model.len()
        )
        .entered();
        let start = Instant::now();

        let formats: BTreeSet<TargetFormat> = formats.iter().copied().collect();
        if formats.is_empty() {
            return Err(ConversionError::MalformedInput(
                "At least one target format is required".to_string(),
            ));
        }
        info!(
            formats = ?formats.iter().map(TargetFormat::as_str).collect::<Vec<_>>(),
            "Starting conversion"
        );

        let (arena, resolution) = self.prepare(model, roots)?;

        let emitters: Vec<Box<dyn Emitter>> = formats.iter().map(|f| self.emitter(*f)).collect();
        let emitted: Vec<EmitOutput> = emitters
            .par_iter()
            .map(|emitter| {
                let _span = info_span!("emit", format = %emitter.format()).entered();
                emitter.emit(&arena)
            })
            .collect();

        let mut stats = ConversionStats {
            roots: arena.roots().len(),
            records: arena.len(),
            edges: arena.edges().len(),
            stubs: arena.records().iter().filter(|r| r.is_stub()).count(),
            failed_records: arena.records().iter().filter(|r| r.is_failed()).count(),
            resolution,
            ..Default::default()
        };

        let mut results = Vec::new();
        let mut outputs = BTreeMap::new();
        for EmitOutput {
            results: format_results,
            output,
        } in emitted
        {
            let format = output.format();
            let entry = stats.formats.entry(format).or_default();
            for result in &format_results {
                if result.is_success() {
                    entry.succeeded += 1;
                } else {
                    entry.failed += 1;
                }
            }
            if entry.failed > 0 {
                warn!(format = %format, failed = entry.failed, "Entities failed to convert");
            }
            results.extend(format_results);
            outputs.insert(format, output);
        }

        let digest = digest(&outputs)?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            records = stats.records,
            edges = stats.edges,
            duration_ms = stats.duration_ms,
            digest = %digest,
            "Conversion completed"
        );

        Ok(ConversionReport {
            results,
            outputs,
            stats,
            digest,
        })
    }
}

/// Convert with default options
pub fn convert(
    model: &ObjectModel,
    roots: &[ObjectId],
    formats: &[TargetFormat],
) -> Result<ConversionReport, ConversionError> {
    Converter::default().convert(model, roots, formats)
}

fn digest(outputs: &BTreeMap<TargetFormat, TargetOutput>) -> Result<String, ConversionError> {
    let bytes = serde_json::to_vec(outputs)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
