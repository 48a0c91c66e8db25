//! Document emitter
//!
//! Produces one JSON tree per root entity. Embed and denormalize edges are
//! inlined as nested objects or arrays; link edges become identity strings.

use super::{EmitOutput, Emitter, TargetOutput, record_failure};
use crate::convert::config::{DocumentOptions, NullPolicy};
use crate::models::{
    Cardinality, ConversionResult, IntermediateRecord, Payload, RecordArena, RecordIdx,
    ReferenceField, TargetFormat,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Identity field of every document and inlined object
pub const ID_FIELD: &str = "_id";

/// Type tag field
pub const TYPE_FIELD: &str = "_type";

/// Documents grouped by collection (the root's type name)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentSet {
    pub collections: BTreeMap<String, Vec<Value>>,
}

impl DocumentSet {
    pub fn collection(&self, name: &str) -> &[Value] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentEmitter {
    options: DocumentOptions,
}

impl DocumentEmitter {
    pub fn new(options: DocumentOptions) -> Self {
        Self { options }
    }

    /// Build the tree rooted at `idx`
    pub fn build(&self, arena: &RecordArena, idx: RecordIdx) -> Value {
        let record = arena.record(idx);
        let mut object = Map::new();

        for (name, field) in &record.scalars {
            if field.is_null() && self.options.null_policy == NullPolicy::Omit {
                continue;
            }
            object.insert(self.field_key(record, name), field.to_json());
        }
        for (name, field) in &record.references {
            object.insert(self.field_key(record, name), self.reference_value(arena, field));
        }

        object.insert(ID_FIELD.to_string(), Value::String(record.id.to_string()));
        if self.options.type_tag {
            object.insert(TYPE_FIELD.to_string(), Value::String(record.type_name.clone()));
        }
        Value::Object(object)
    }

    /// Key for a record field. Fields named like `_id` (or `_type` when
    /// tagging) get extra leading underscores until the key is free.
    fn field_key(&self, record: &IntermediateRecord, name: &str) -> String {
        let reserved = |key: &str| key == ID_FIELD || (self.options.type_tag && key == TYPE_FIELD);
        let mut key = name.to_string();
        while reserved(&key)
            || (key != name
                && (record.scalars.contains_key(&key) || record.references.contains_key(&key)))
        {
            key.insert(0, '_');
        }
        if key != name {
            warn!("Field {} of {} written as {}", name, record.id, key);
        }
        key
    }

    fn reference_value(&self, arena: &RecordArena, field: &ReferenceField) -> Value {
        let mut items = field.edges.iter().map(|&edge_idx| {
            let edge = arena.edge(edge_idx);
            if edge.class.is_inlined() {
                self.build(arena, edge.target)
            } else {
                Value::String(arena.record(edge.target).id.to_string())
            }
        });

        match field.cardinality {
            Cardinality::One => items.next().unwrap_or(Value::Null),
            Cardinality::Many => Value::Array(items.collect()),
        }
    }
}

impl Emitter for DocumentEmitter {
    fn format(&self) -> TargetFormat {
        TargetFormat::Document
    }

    fn emit(&self, arena: &RecordArena) -> EmitOutput {
        let mut results = Vec::with_capacity(arena.roots().len());
        let mut documents = DocumentSet::default();

        for &idx in arena.roots() {
            let record = arena.record(idx);
            if let Some(failure) = record_failure(record) {
                warn!("Document for {} not emitted: {}", record.id, failure.message);
                results.push(ConversionResult::failure(
                    record.id.clone(),
                    TargetFormat::Document,
                    failure,
                ));
                continue;
            }

            let document = self.build(arena, idx);
            documents
                .collections
                .entry(record.type_name.clone())
                .or_default()
                .push(document.clone());
            results.push(ConversionResult::success(
                record.id.clone(),
                TargetFormat::Document,
                Payload::Document(document),
            ));
        }

        info!(
            "Emitted {} documents in {} collections",
            documents.len(),
            documents.collections.len()
        );
        EmitOutput {
            results,
            output: TargetOutput::Document(documents),
        }
    }
}
