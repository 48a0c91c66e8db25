//! Output writer
//!
//! Persists a conversion report under a directory:
//!
//! ```text
//! <dir>/documents/<collection>.jsonl
//! <dir>/graph/nodes.json
//! <dir>/graph/edges.json
//! <dir>/columnar/<table>.json
//! <dir>/columnar/junction/<table>.json
//! <dir>/report.json
//! ```
//!
//! With YAML encoding every file is written as `.yaml` instead and
//! documents become one YAML list per collection.

use super::{ColumnarDataset, DocumentSet, ExportError, PropertyGraph, TargetOutput};
use crate::convert::{ConversionReport, ConversionStats};
use crate::models::ConversionResult;
use crate::validation::input::{sanitize_identifier, unique_identifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File encoding for written outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    #[default]
    Json,
    Yaml,
}

impl OutputEncoding {
    fn extension(&self) -> &'static str {
        match self {
            OutputEncoding::Json => "json",
            OutputEncoding::Yaml => "yaml",
        }
    }
}

/// A file produced by the writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Documents, nodes, edges or rows in the file
    pub entries: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportSummary<'a> {
    digest: &'a str,
    stats: &'a ConversionStats,
    failures: Vec<&'a ConversionResult>,
}

/// Writes conversion outputs to a directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    encoding: OutputEncoding,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            encoding: OutputEncoding::Json,
        }
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every output in the report plus a `report` summary file
    pub fn write_report(&self, report: &ConversionReport) -> Result<Vec<WrittenFile>, ExportError> {
        let mut written = Vec::new();
        for output in report.outputs.values() {
            written.extend(self.write_output(output)?);
        }

        let summary = ReportSummary {
            digest: &report.digest,
            stats: &report.stats,
            failures: report.failures().collect(),
        };
        let path = self.root.join(format!("report.{}", self.encoding.extension()));
        let entries = summary.failures.len();
        self.write_value(&path, &summary)?;
        written.push(WrittenFile { path, entries });

        info!(
            files = written.len(),
            dir = %self.root.display(),
            "Wrote conversion outputs"
        );
        Ok(written)
    }

    pub fn write_output(&self, output: &TargetOutput) -> Result<Vec<WrittenFile>, ExportError> {
        match output {
            TargetOutput::Document(documents) => self.write_documents(documents),
            TargetOutput::Graph(graph) => self.write_graph(graph),
            TargetOutput::Columnar(dataset) => self.write_columnar(dataset),
        }
    }

    fn write_documents(&self, documents: &DocumentSet) -> Result<Vec<WrittenFile>, ExportError> {
        let dir = self.root.join("documents");
        fs::create_dir_all(&dir)?;

        let mut written = Vec::with_capacity(documents.collections.len());
        let mut taken = HashSet::new();
        for (collection, docs) in &documents.collections {
            let name = unique_identifier(&sanitize_identifier(collection, false), &taken);
            taken.insert(name.clone());
            let path = match self.encoding {
                OutputEncoding::Json => {
                    let path = dir.join(format!("{}.jsonl", name));
                    let mut lines = String::new();
                    for doc in docs {
                        lines.push_str(&serde_json::to_string(doc)?);
                        lines.push('\n');
                    }
                    fs::write(&path, lines)?;
                    path
                }
                OutputEncoding::Yaml => {
                    let path = dir.join(format!("{}.yaml", name));
                    self.write_value(&path, docs)?;
                    path
                }
            };
            debug!("Wrote {} documents to {}", docs.len(), path.display());
            written.push(WrittenFile {
                path,
                entries: docs.len(),
            });
        }
        Ok(written)
    }

    fn write_graph(&self, graph: &PropertyGraph) -> Result<Vec<WrittenFile>, ExportError> {
        let dir = self.root.join("graph");
        fs::create_dir_all(&dir)?;

        let ext = self.encoding.extension();
        let nodes = dir.join(format!("nodes.{}", ext));
        self.write_value(&nodes, &graph.nodes)?;
        let edges = dir.join(format!("edges.{}", ext));
        self.write_value(&edges, &graph.edges)?;

        Ok(vec![
            WrittenFile {
                path: nodes,
                entries: graph.nodes.len(),
            },
            WrittenFile {
                path: edges,
                entries: graph.edges.len(),
            },
        ])
    }

    fn write_columnar(&self, dataset: &ColumnarDataset) -> Result<Vec<WrittenFile>, ExportError> {
        let dir = self.root.join("columnar");
        let junction_dir = dir.join("junction");
        fs::create_dir_all(&dir)?;

        let ext = self.encoding.extension();
        let mut written = Vec::new();
        for table in &dataset.tables {
            let path = dir.join(format!("{}.{}", table.name, ext));
            self.write_value(&path, table)?;
            written.push(WrittenFile {
                path,
                entries: table.rows.len(),
            });
        }
        if !dataset.junction_tables.is_empty() {
            fs::create_dir_all(&junction_dir)?;
        }
        for junction in &dataset.junction_tables {
            let path = junction_dir.join(format!("{}.{}", junction.name, ext));
            self.write_value(&path, junction)?;
            written.push(WrittenFile {
                path,
                entries: junction.rows.len(),
            });
        }
        Ok(written)
    }

    fn write_value<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), ExportError> {
        let content = match self.encoding {
            OutputEncoding::Json => {
                let mut text = serde_json::to_string_pretty(value)?;
                text.push('\n');
                text
            }
            OutputEncoding::Yaml => serde_yaml::to_string(value)?,
        };
        fs::write(path, content)?;
        Ok(())
    }
}
