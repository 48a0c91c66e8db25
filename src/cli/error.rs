//! CLI error types

use crate::convert::ConversionError;
use crate::export::ExportError;
use crate::model::LoadError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Invalid configuration in {0}: {1}")]
    ConfigError(PathBuf, String),

    #[error("Failed to load model: {0}")]
    LoadError(#[from] LoadError),

    #[error("Conversion failed: {0}")]
    ConversionError(#[from] ConversionError),

    #[error("Failed to write output: {0}")]
    ExportError(#[from] ExportError),

    /// Conversion finished but some entities failed and `--strict` was given
    #[error("{0} entities failed to convert")]
    PartialFailure(usize),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::PartialFailure(_) => 2,
            _ => 1,
        }
    }
}
