//! Object Model Converter - re-shapes in-memory object graphs into
//! document, property-graph and columnar representations
//!
//! Provides unified interfaces for:
//! - Object model types and JSON/YAML model loading
//! - Graph traversal into an intermediate representation (reader)
//! - Shared embed/link/denormalize classification (resolver)
//! - Document, graph and columnar emitters plus an output writer
//! - The conversion driver with per-entity partial-failure reporting
//!
//! ```
//! use object_model_converter::{convert, FieldValue, ObjectId, ObjectInstance, ObjectModel, TargetFormat};
//!
//! let model: ObjectModel = [
//!     ObjectInstance::new("t1", "Team")
//!         .with_field("name", "Lions")
//!         .with_field("players", FieldValue::references(["p1"])),
//!     ObjectInstance::new("p1", "Player")
//!         .with_field("name", "Ann")
//!         .with_field("team", FieldValue::reference("t1")),
//! ]
//! .into_iter()
//! .collect();
//!
//! let report = convert(&model, &[ObjectId::from("t1")], &[TargetFormat::Document]).unwrap();
//! assert!(report.is_complete_success());
//! ```

pub mod cli;
pub mod convert;
pub mod export;
pub mod model;
pub mod models;
pub mod reader;
pub mod resolver;
pub mod validation;

// Re-export commonly used types
pub use convert::{
    ConversionError, ConversionOptions, ConversionReport, ConversionStats, Converter, ErrorKind,
    convert,
};
pub use export::{
    ColumnarDataset, ColumnarEmitter, DocumentEmitter, DocumentSet, EmitOutput, Emitter,
    ExportError, GraphEmitter, OutputWriter, PropertyGraph, TargetOutput,
};
pub use model::{LoadError, LoadedModel, ModelLoader};
pub use models::{
    ConversionOutcome, ConversionResult, EdgeClass, FieldValue, ObjectId, ObjectInstance,
    ObjectModel, ObjectRef, RecordArena, RelationKind, Scalar, TargetFormat,
};
pub use reader::ObjectReader;
pub use resolver::ReferenceResolver;
pub use validation::ValidationError;
