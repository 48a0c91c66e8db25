//! Models module
//!
//! Source object graph types, the intermediate representation built from
//! them and the per-entity conversion results.

pub mod ir;
pub mod object;
pub mod result;
pub mod value;

pub use ir::{
    Cardinality, EdgeClass, EdgeIdx, IntermediateRecord, RecordArena, RecordIdx, RecordStatus,
    ReferenceEdge, ReferenceField, RelationGroup, RelationKind, ScalarField,
};
pub use object::{ObjectInstance, ObjectModel};
pub use result::{
    ConversionOutcome, ConversionResult, EntityFailure, GraphEdge, GraphFragment, GraphNode,
    JunctionRow, Payload, RowFragment, TargetFormat,
};
pub use value::{FieldShape, FieldValue, ObjectId, ObjectRef, Scalar};
