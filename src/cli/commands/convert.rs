//! Convert command implementation

use super::{load_model, load_options, select_roots};
use crate::cli::error::CliError;
use crate::cli::output::format_report;
use crate::convert::{ConversionReport, Converter, UnresolvedPolicy};
use crate::export::{OutputEncoding, OutputWriter};
use crate::models::TargetFormat;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the convert command
#[derive(Debug, Clone, Default)]
pub struct ConvertCommand {
    /// Model file, or `-` for JSON on stdin
    pub input: String,
    /// Target formats; empty means all three
    pub formats: Vec<String>,
    /// Directory to write outputs to; stdout when absent
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub roots: Vec<String>,
    pub encoding: OutputEncoding,
    /// Stub missing reference targets instead of failing the referrer
    pub stub_unresolved: bool,
    /// Treat any failed entity as a command failure
    pub strict: bool,
}

fn parse_formats(formats: &[String]) -> Result<Vec<TargetFormat>, CliError> {
    if formats.is_empty() {
        return Ok(TargetFormat::ALL.to_vec());
    }
    formats
        .iter()
        .flat_map(|f| f.split(','))
        .filter(|f| !f.trim().is_empty())
        .map(|f| {
            f.parse::<TargetFormat>()
                .map_err(|_| CliError::InvalidArgument(format!("Unknown format: {}", f.trim())))
        })
        .collect()
}

/// Handle the convert command
pub fn handle_convert(command: &ConvertCommand) -> Result<ConversionReport, CliError> {
    let formats = parse_formats(&command.formats)?;
    let mut options = load_options(command.config.as_deref())?;
    if command.stub_unresolved {
        options.traversal.unresolved = UnresolvedPolicy::Stub;
    }

    let loaded = load_model(&command.input)?;
    let roots = select_roots(&loaded, &command.roots);
    info!(objects = loaded.model.len(), roots = roots.len(), "Model loaded");

    let report = Converter::new(options).convert(&loaded.model, &roots, &formats)?;

    match &command.output_dir {
        Some(dir) => {
            let written = OutputWriter::new(dir)
                .with_encoding(command.encoding)
                .write_report(&report)?;
            println!("{}", format_report(&report, &written));
        }
        None => {
            let text = match command.encoding {
                OutputEncoding::Json => serde_json::to_string_pretty(&report.outputs)
                    .map_err(|e| CliError::InvalidArgument(e.to_string()))?,
                OutputEncoding::Yaml => serde_yaml::to_string(&report.outputs)
                    .map_err(|e| CliError::InvalidArgument(e.to_string()))?,
            };
            println!("{}", text);
            eprintln!("{}", format_report(&report, &[]));
        }
    }

    let failed = report.failures().count();
    if command.strict && failed > 0 {
        return Err(CliError::PartialFailure(failed));
    }
    Ok(report)
}
