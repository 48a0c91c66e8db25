//! Intermediate representation shared by all emitters
//!
//! The reader produces a [`RecordArena`]: records indexed by position, plus
//! reference edges stored as explicit (source, field, target) triples. The
//! resolver annotates edges in place; after that the arena is read-only and
//! emitters may read it from several threads at once.

use super::value::{FieldShape, ObjectId, Scalar};
use crate::convert::ConversionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Index of a record in its arena
pub type RecordIdx = usize;

/// Index of an edge in its arena
pub type EdgeIdx = usize;

/// Cardinality of a reference field, derived from its value shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    One,
    Many,
}

/// How an edge is represented in the targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeClass {
    /// Inline the target inside the source
    Embed,
    /// Store the target identity only
    Link,
    /// Inline in documents, copy the target's scalars into columnar rows
    Denormalize,
}

impl EdgeClass {
    /// Whether the target's content travels with the source
    pub fn is_inlined(&self) -> bool {
        matches!(self, EdgeClass::Embed | EdgeClass::Denormalize)
    }
}

impl fmt::Display for EdgeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeClass::Embed => write!(f, "embed"),
            EdgeClass::Link => write!(f, "link"),
            EdgeClass::Denormalize => write!(f, "denormalize"),
        }
    }
}

/// Relationship kind of a (source type, field) group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::OneToOne => write!(f, "one-to-one"),
            RelationKind::ManyToOne => write!(f, "many-to-one"),
            RelationKind::OneToMany => write!(f, "one-to-many"),
            RelationKind::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// All edges leaving records of one type through one field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationGroup {
    pub source_type: String,
    pub field: String,
}

impl RelationGroup {
    pub fn new(source_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for RelationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source_type, self.field)
    }
}

/// Directed reference from one record to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEdge {
    pub source: RecordIdx,
    pub field: String,
    pub target: RecordIdx,
    pub cardinality: Cardinality,
    /// Position inside the source collection (0 for single references)
    pub position: usize,
    /// Target was on the traversal path when the edge was found
    pub back_edge: bool,
    /// Set by the resolver; `Link` until then
    pub class: EdgeClass,
}

/// Non-reference field of a record
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarField {
    Single(Scalar),
    List { ordered: bool, items: Vec<Scalar> },
    Map(BTreeMap<String, Scalar>),
}

impl ScalarField {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarField::Single(Scalar::Null))
    }

    pub fn shape(&self) -> FieldShape {
        match self {
            ScalarField::Single(Scalar::Null) => FieldShape::Null,
            ScalarField::Single(_) => FieldShape::Scalar,
            ScalarField::List { items, .. } if items.is_empty() => FieldShape::EmptyCollection,
            ScalarField::List { .. } => FieldShape::Scalars,
            ScalarField::Map(_) => FieldShape::Map,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarField::Single(scalar) => scalar.to_json(),
            ScalarField::List { items, .. } => {
                serde_json::Value::Array(items.iter().map(Scalar::to_json).collect())
            }
            ScalarField::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ScalarField {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Reference field of a record and the edges it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceField {
    pub cardinality: Cardinality,
    pub ordered: bool,
    pub edges: Vec<EdgeIdx>,
}

/// Lifecycle state of a record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordStatus {
    Complete,
    /// Identity and type only, standing in for a missing target
    Stub,
    Failed(ConversionError),
}

/// Normalized form of one object instance
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateRecord {
    pub id: ObjectId,
    pub type_name: String,
    pub supertypes: Vec<String>,
    pub scalars: BTreeMap<String, ScalarField>,
    pub references: BTreeMap<String, ReferenceField>,
    pub status: RecordStatus,
    pub root: bool,
    /// Traversal depth at which the record was first reached
    pub depth: usize,
}

impl IntermediateRecord {
    pub fn new(id: ObjectId, type_name: impl Into<String>, depth: usize) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            supertypes: Vec::new(),
            scalars: BTreeMap::new(),
            references: BTreeMap::new(),
            status: RecordStatus::Complete,
            root: false,
            depth,
        }
    }

    pub fn stub(id: ObjectId, type_name: impl Into<String>, depth: usize) -> Self {
        let mut record = Self::new(id, type_name, depth);
        record.status = RecordStatus::Stub;
        record
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RecordStatus::Failed(_))
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.status, RecordStatus::Stub)
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match &self.status {
            RecordStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Mark the record failed, keeping the first error if it already failed
    pub fn fail(&mut self, error: ConversionError) {
        if !self.is_failed() {
            self.status = RecordStatus::Failed(error);
        }
    }

    /// Shape of every field, sorted by field name
    pub fn field_shapes(&self) -> BTreeMap<&str, FieldShape> {
        let mut shapes: BTreeMap<&str, FieldShape> = self
            .scalars
            .iter()
            .map(|(name, field)| (name.as_str(), field.shape()))
            .collect();
        for (name, field) in &self.references {
            let shape = match field.cardinality {
                Cardinality::One => FieldShape::Reference,
                Cardinality::Many => FieldShape::References,
            };
            shapes.insert(name.as_str(), shape);
        }
        shapes
    }

    /// Type name followed by supertypes, without duplicates
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![self.type_name.clone()];
        for supertype in &self.supertypes {
            if !labels.contains(supertype) {
                labels.push(supertype.clone());
            }
        }
        labels
    }
}

/// Records and edges of one conversion run
#[derive(Debug, Clone, Default)]
pub struct RecordArena {
    records: Vec<IntermediateRecord>,
    edges: Vec<ReferenceEdge>,
    index: HashMap<ObjectId, RecordIdx>,
    roots: Vec<RecordIdx>,
    relations: BTreeMap<RelationGroup, RelationKind>,
}

impl RecordArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, record: IntermediateRecord) -> RecordIdx {
        let idx = self.records.len();
        self.index.insert(record.id.clone(), idx);
        self.records.push(record);
        idx
    }

    /// Append an edge and register it on its source record's field
    pub fn push_edge(&mut self, edge: ReferenceEdge) -> EdgeIdx {
        let idx = self.edges.len();
        let source = &mut self.records[edge.source];
        source
            .references
            .entry(edge.field.clone())
            .or_insert_with(|| ReferenceField {
                cardinality: edge.cardinality,
                ordered: true,
                edges: Vec::new(),
            })
            .edges
            .push(idx);
        self.edges.push(edge);
        idx
    }

    pub fn mark_root(&mut self, idx: RecordIdx) {
        if !self.roots.contains(&idx) {
            self.roots.push(idx);
        }
        self.records[idx].root = true;
    }

    pub fn lookup(&self, id: &ObjectId) -> Option<RecordIdx> {
        self.index.get(id).copied()
    }

    pub fn record(&self, idx: RecordIdx) -> &IntermediateRecord {
        &self.records[idx]
    }

    pub fn record_mut(&mut self, idx: RecordIdx) -> &mut IntermediateRecord {
        &mut self.records[idx]
    }

    pub fn record_by_id(&self, id: &ObjectId) -> Option<&IntermediateRecord> {
        self.lookup(id).map(|idx| &self.records[idx])
    }

    pub fn edge(&self, idx: EdgeIdx) -> &ReferenceEdge {
        &self.edges[idx]
    }

    pub fn edge_mut(&mut self, idx: EdgeIdx) -> &mut ReferenceEdge {
        &mut self.edges[idx]
    }

    pub fn records(&self) -> &[IntermediateRecord] {
        &self.records
    }

    pub fn edges(&self) -> &[ReferenceEdge] {
        &self.edges
    }

    pub fn roots(&self) -> &[RecordIdx] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Edges whose source record has not failed
    pub fn live_edges(&self) -> impl Iterator<Item = (EdgeIdx, &ReferenceEdge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| !self.records[edge.source].is_failed())
    }

    pub fn relation(&self, group: &RelationGroup) -> Option<RelationKind> {
        self.relations.get(group).copied()
    }

    pub fn relations(&self) -> &BTreeMap<RelationGroup, RelationKind> {
        &self.relations
    }

    pub fn set_relation(&mut self, group: RelationGroup, kind: RelationKind) {
        self.relations.insert(group, kind);
    }

    /// Relation group an edge belongs to
    pub fn group_of(&self, edge: &ReferenceEdge) -> RelationGroup {
        RelationGroup::new(self.records[edge.source].type_name.clone(), edge.field.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with_pair() -> RecordArena {
        let mut arena = RecordArena::new();
        let team = arena.push_record(IntermediateRecord::new(ObjectId::from("t1"), "Team", 0));
        let player = arena.push_record(IntermediateRecord::new(ObjectId::from("p1"), "Player", 1));
        arena.push_edge(ReferenceEdge {
            source: team,
            field: "players".to_string(),
            target: player,
            cardinality: Cardinality::Many,
            position: 0,
            back_edge: false,
            class: EdgeClass::Link,
        });
        arena.mark_root(team);
        arena
    }

    #[test]
    fn test_push_edge_registers_field() {
        let arena = arena_with_pair();
        let team = arena.record_by_id(&ObjectId::from("t1")).unwrap();
        let players = &team.references["players"];
        assert_eq!(players.cardinality, Cardinality::Many);
        assert_eq!(players.edges, vec![0]);
        assert_eq!(arena.roots(), &[0]);
        assert!(team.root);
    }

    #[test]
    fn test_live_edges_skip_failed_sources() {
        let mut arena = arena_with_pair();
        assert_eq!(arena.live_edges().count(), 1);
        arena.record_mut(0).fail(ConversionError::MalformedInput("x".to_string()));
        assert_eq!(arena.live_edges().count(), 0);
    }

    #[test]
    fn test_fail_keeps_first_error() {
        let mut record = IntermediateRecord::new(ObjectId::from("a"), "A", 0);
        record.fail(ConversionError::MalformedInput("first".to_string()));
        record.fail(ConversionError::MalformedInput("second".to_string()));
        assert_eq!(
            record.error(),
            Some(&ConversionError::MalformedInput("first".to_string()))
        );
    }

    #[test]
    fn test_labels_deduplicate() {
        let mut record = IntermediateRecord::new(ObjectId::from("e1"), "Employee", 0);
        record.supertypes = vec!["Person".to_string(), "Employee".to_string()];
        assert_eq!(record.labels(), vec!["Employee", "Person"]);
    }
}
