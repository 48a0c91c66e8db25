//! Inspect command implementation

use super::{load_model, load_options, select_roots};
use crate::cli::error::CliError;
use crate::cli::output::format_inspection;
use crate::convert::Converter;
use std::path::PathBuf;

/// Handle the inspect command: read and resolve the model, then print the
/// relation kinds and edge classifications without emitting anything
pub fn handle_inspect(
    input: &str,
    config: Option<PathBuf>,
    roots: &[String],
) -> Result<(), CliError> {
    let options = load_options(config.as_deref())?;
    let loaded = load_model(input)?;
    let roots = select_roots(&loaded, roots);

    let (arena, stats) = Converter::new(options).prepare(&loaded.model, &roots)?;
    println!("{}", format_inspection(&arena, &stats));
    Ok(())
}
