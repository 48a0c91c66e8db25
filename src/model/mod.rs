//! Model loading functionality
//!
//! Reads object graphs from JSON or YAML documents into an [`ObjectModel`].
//!
//! [`ObjectModel`]: crate::models::ObjectModel

pub mod loader;

pub use loader::{LoadError, LoadedModel, ModelLoader};
