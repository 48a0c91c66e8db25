//! CLI command implementations

pub mod convert;
pub mod inspect;

use crate::cli::error::CliError;
use crate::convert::ConversionOptions;
use crate::model::{LoadedModel, ModelLoader};
use crate::models::ObjectId;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Load a model from a file, or from stdin as JSON when `input` is `-`
pub(crate) fn load_model(input: &str) -> Result<LoadedModel, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(ModelLoader::from_json_str(&content)?)
    } else {
        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(CliError::FileReadError(path, "file not found".to_string()));
        }
        Ok(ModelLoader::from_path(&path)?)
    }
}

/// Load conversion options from a TOML file, or defaults
pub(crate) fn load_options(config: Option<&Path>) -> Result<ConversionOptions, CliError> {
    let Some(path) = config else {
        return Ok(ConversionOptions::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    toml::from_str(&content).map_err(|e| CliError::ConfigError(path.to_path_buf(), e.to_string()))
}

/// Roots given on the command line override the model's declared roots
pub(crate) fn select_roots(loaded: &LoadedModel, roots: &[String]) -> Vec<ObjectId> {
    if roots.is_empty() {
        loaded.roots.clone()
    } else {
        roots.iter().map(|r| ObjectId::from(r.as_str())).collect()
    }
}
