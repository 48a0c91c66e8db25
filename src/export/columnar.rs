//! Columnar emitter
//!
//! Builds one fixed-schema table per type. Scalar fields become typed
//! columns, one-cardinality references and one-to-many collections become
//! foreign-key columns, and many-to-many collections become junction tables
//! with deduplicated rows.
//!
//! Emission runs in two passes: the schema pass merges column types record
//! by record (a record that conflicts with the schema so far fails and
//! contributes nothing), then the row pass renders every surviving record
//! against the final schema.

use super::{EmitOutput, Emitter, TargetOutput, record_failure};
use crate::convert::config::ColumnarOptions;
use crate::convert::error::{ConversionError, ErrorKind};
use crate::models::{
    Cardinality, ConversionResult, EdgeClass, EntityFailure, IntermediateRecord, JunctionRow,
    ObjectId, Payload, RecordArena, RecordIdx, RelationGroup, RelationKind, RowFragment, Scalar,
    ScalarField, TargetFormat,
};
use crate::validation::input::{sanitize_identifier, to_snake_case, unique_identifier};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Column type vocabulary of the columnar target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Boolean,
    BigInt,
    Double,
    Uuid,
    Timestamp,
    Date,
    List(Box<ColumnType>),
    Map(Box<ColumnType>),
    /// Only nulls or empty collections seen so far
    Unknown,
}

impl ColumnType {
    pub fn of_scalar(scalar: &Scalar) -> ColumnType {
        match scalar {
            Scalar::Null => ColumnType::Unknown,
            Scalar::Bool(_) => ColumnType::Boolean,
            Scalar::Int(_) => ColumnType::BigInt,
            Scalar::Float(_) => ColumnType::Double,
            Scalar::Text(_) | Scalar::Complex { .. } => ColumnType::Text,
            Scalar::Date(_) => ColumnType::Date,
            Scalar::DateTime(_) => ColumnType::Timestamp,
            Scalar::Uuid(_) => ColumnType::Uuid,
        }
    }

    /// Type of a scalar field, or `None` when its items disagree
    pub fn of_field(field: &ScalarField) -> Option<ColumnType> {
        match field {
            ScalarField::Single(scalar) => Some(Self::of_scalar(scalar)),
            ScalarField::List { items, .. } => items
                .iter()
                .try_fold(ColumnType::Unknown, |acc, item| {
                    acc.merge(&Self::of_scalar(item))
                })
                .map(|item| ColumnType::List(Box::new(item))),
            ScalarField::Map(entries) => entries
                .values()
                .try_fold(ColumnType::Unknown, |acc, value| {
                    acc.merge(&Self::of_scalar(value))
                })
                .map(|value| ColumnType::Map(Box::new(value))),
        }
    }

    /// Combine two observations of one column. `bigint` widens to
    /// `double`; any other disagreement is a conflict.
    pub fn merge(&self, other: &ColumnType) -> Option<ColumnType> {
        use ColumnType::*;

        match (self, other) {
            (Unknown, t) | (t, Unknown) => Some(t.clone()),
            (BigInt, Double) | (Double, BigInt) => Some(Double),
            (List(a), List(b)) => a.merge(b).map(|t| List(Box::new(t))),
            (Map(a), Map(b)) => a.merge(b).map(|t| Map(Box::new(t))),
            (a, b) if a == b => Some(a.clone()),
            _ => None,
        }
    }

    /// Replace unknown types with `text`
    fn finalize(self) -> ColumnType {
        match self {
            ColumnType::Unknown => ColumnType::Text,
            ColumnType::List(item) => ColumnType::List(Box::new(item.finalize())),
            ColumnType::Map(value) => ColumnType::Map(Box::new(value.finalize())),
            other => other,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::List(item) => write!(f, "list<{}>", item),
            ColumnType::Map(value) => write!(f, "map<text, {}>", value),
            ColumnType::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Role of a column in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    PrimaryKey,
    Scalar,
    ForeignKey,
    Denormalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ColumnType,
    pub kind: ColumnKind,
    /// Tables referenced by a foreign-key column
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub references: BTreeSet<String>,
}

/// One value in a row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value for this record
    Empty,
    Scalar(Scalar),
    List(Vec<Scalar>),
    Map(BTreeMap<String, Scalar>),
    /// Primary or foreign key
    Identity(ObjectId),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Empty => serde_json::Value::Null,
            Cell::Scalar(scalar) => scalar.to_json(),
            Cell::List(items) => serde_json::Value::Array(items.iter().map(Scalar::to_json).collect()),
            Cell::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Cell::Identity(id) => serde_json::Value::String(id.to_string()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Fixed-schema table holding the rows of one type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub type_name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Two-column table recording many-to-many pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionTable {
    pub name: String,
    pub source_column: String,
    pub target_column: String,
    pub rows: Vec<(ObjectId, ObjectId)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnarDataset {
    pub tables: Vec<Table>,
    pub junction_tables: Vec<JunctionTable>,
}

impl ColumnarDataset {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn junction_table(&self, name: &str) -> Option<&JunctionTable> {
        self.junction_tables.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnarEmitter {
    options: ColumnarOptions,
}

/// Where a foreign-key value comes from
#[derive(Debug, Clone)]
enum KeySource {
    /// Target of the record's own one-cardinality field
    Outgoing { field: String },
    /// Source of the one-to-many edge pointing at the record
    Inbound { group: RelationGroup },
}

#[derive(Debug, Default)]
struct TableSchema {
    name: String,
    scalars: BTreeMap<String, ColumnType>,
    /// scalar field -> column name
    columns: BTreeMap<String, String>,
    keys: BTreeMap<String, (KeySource, BTreeSet<String>)>,
    /// column -> (reference field, target scalar field, type)
    denormalized: BTreeMap<String, (String, String, ColumnType)>,
}

impl TableSchema {
    fn column_names(&self, primary_key: &str) -> HashSet<String> {
        let mut names: HashSet<String> = self.columns.values().cloned().collect();
        names.insert(primary_key.to_string());
        names.extend(self.keys.keys().cloned());
        names.extend(self.denormalized.keys().cloned());
        names
    }
}

#[derive(Debug)]
struct JunctionSchema {
    table: JunctionTable,
    seen: HashSet<(ObjectId, ObjectId)>,
}

impl ColumnarEmitter {
    pub fn new(options: ColumnarOptions) -> Self {
        Self { options }
    }

    fn ident(&self, name: &str) -> String {
        sanitize_identifier(name, self.options.lowercase_identifiers)
    }

    /// Table of `type_name`, or its plain identifier when no record of the
    /// type made it into the schema
    fn table_of(&self, schemas: &BTreeMap<String, TableSchema>, type_name: &str) -> String {
        schemas
            .get(type_name)
            .map_or_else(|| self.ident(type_name), |schema| schema.name.clone())
    }

    /// Assign distinct table names. Types whose identifiers collide get a
    /// numeric suffix in type-name order.
    fn name_tables(&self, schemas: &mut BTreeMap<String, TableSchema>) -> HashSet<String> {
        let mut taken = HashSet::new();
        for (type_name, schema) in schemas.iter_mut() {
            let name = unique_identifier(&self.ident(type_name), &taken);
            if name != self.ident(type_name) {
                warn!("Table name for {} collides, using {}", type_name, name);
            }
            taken.insert(name.clone());
            schema.name = name;
        }
        taken
    }

    /// Column names for scalar fields, distinct from the primary key and
    /// from each other
    fn name_scalar_columns(&self, schema: &mut TableSchema) {
        let mut taken = HashSet::from([self.ident("id")]);
        let mut columns = BTreeMap::new();
        for field in schema.scalars.keys() {
            let name = unique_identifier(&self.ident(field), &taken);
            taken.insert(name.clone());
            columns.insert(field.clone(), name);
        }
        schema.columns = columns;
    }

    /// Base name of the junction table for a many-to-many group
    pub fn junction_name(&self, group: &RelationGroup) -> String {
        self.ident(&format!("{}_{}", to_snake_case(&group.source_type), group.field))
    }

    fn junction_columns(&self, group: &RelationGroup) -> (String, String) {
        let source = self.ident(&format!("{}_id", to_snake_case(&group.source_type)));
        let target = self.ident(&format!("{}_id", group.field));
        if source == target {
            (self.ident("source_id"), self.ident("target_id"))
        } else {
            (source, target)
        }
    }

    /// Schema pass: merge scalar column types, failing conflicting records
    fn merge_scalars(
        &self,
        arena: &RecordArena,
        schemas: &mut BTreeMap<String, TableSchema>,
    ) -> HashMap<RecordIdx, EntityFailure> {
        let mut failures = HashMap::new();

        for (idx, record) in arena.records().iter().enumerate() {
            if record.is_failed() {
                continue;
            }
            let schema = schemas.entry(record.type_name.clone()).or_default();

            match merged_columns(record, &schema.scalars) {
                Ok(merged) => schema.scalars.extend(merged),
                Err(error) => {
                    warn!("Columnar row for {} rejected: {}", record.id, error);
                    if let Some(failure) = EntityFailure::from_error(&error, &record.id) {
                        failures.insert(idx, failure);
                    }
                }
            }
        }
        failures
    }

    fn unique_column(&self, schema: &TableSchema, candidate: &str) -> String {
        let taken = schema.column_names(&self.ident("id"));
        unique_identifier(&self.ident(candidate), &taken)
    }

    /// Key pass: foreign-key columns, denormalized columns and junction tables
    fn add_relations(
        &self,
        arena: &RecordArena,
        schemas: &mut BTreeMap<String, TableSchema>,
        taken_tables: &mut HashSet<String>,
    ) -> (HashMap<(RecordIdx, String), ObjectId>, BTreeMap<RelationGroup, JunctionSchema>) {
        // (target record, column) -> source identity, for one-to-many keys
        let mut inbound: HashMap<(RecordIdx, String), ObjectId> = HashMap::new();
        let mut junctions: BTreeMap<RelationGroup, JunctionSchema> = BTreeMap::new();
        // group -> column name, per table
        let mut outgoing_cols: HashMap<(String, String), String> = HashMap::new();
        let mut inbound_cols: HashMap<(String, RelationGroup), String> = HashMap::new();
        let mut denorm_cols: HashMap<(String, String, String), String> = HashMap::new();
        let mirrored = mirrored_groups(arena);

        for (_, edge) in arena.live_edges() {
            let source = arena.record(edge.source);
            let target = arena.record(edge.target);
            let group = arena.group_of(edge);
            let target_table = self.table_of(schemas, &target.type_name);

            match (edge.cardinality, arena.relation(&group)) {
                (Cardinality::One, _) => {
                    let key = (source.type_name.clone(), edge.field.clone());
                    let column = match outgoing_cols.get(&key) {
                        Some(column) => column.clone(),
                        None => {
                            let Some(schema) = schemas.get(&source.type_name) else {
                                continue;
                            };
                            let column = self.unique_column(schema, &format!("{}_id", edge.field));
                            outgoing_cols.insert(key, column.clone());
                            column
                        }
                    };
                    if let Some(schema) = schemas.get_mut(&source.type_name) {
                        schema
                            .keys
                            .entry(column)
                            .or_insert_with(|| {
                                (
                                    KeySource::Outgoing {
                                        field: edge.field.clone(),
                                    },
                                    BTreeSet::new(),
                                )
                            })
                            .1
                            .insert(target_table);
                    }

                    if edge.class == EdgeClass::Denormalize {
                        self.add_denormalized(
                            schemas,
                            &mut denorm_cols,
                            &source.type_name,
                            &edge.field,
                            target,
                        );
                    }
                }
                (Cardinality::Many, Some(RelationKind::ManyToMany)) => {
                    let junction = junctions.entry(group.clone()).or_insert_with(|| {
                        let (source_column, target_column) = self.junction_columns(&group);
                        let name = unique_identifier(&self.junction_name(&group), taken_tables);
                        taken_tables.insert(name.clone());
                        JunctionSchema {
                            table: JunctionTable {
                                name,
                                source_column,
                                target_column,
                                rows: Vec::new(),
                            },
                            seen: HashSet::new(),
                        }
                    });
                    debug!("{} -> junction {}", group, junction.table.name);
                }
                (Cardinality::Many, _) if mirrored.contains(&group) => {
                    debug!("{} mirrored by a key on {}", group, target_table);
                }
                (Cardinality::Many, _) => {
                    let key = (target.type_name.clone(), group.clone());
                    let column = match inbound_cols.get(&key) {
                        Some(column) => column.clone(),
                        None => {
                            let Some(schema) = schemas.get(&target.type_name) else {
                                continue;
                            };
                            let candidate = format!(
                                "{}_{}_id",
                                to_snake_case(&group.source_type),
                                group.field
                            );
                            let column = self.unique_column(schema, &candidate);
                            inbound_cols.insert(key, column.clone());
                            column
                        }
                    };
                    let source_table = self.table_of(schemas, &source.type_name);
                    if let Some(schema) = schemas.get_mut(&target.type_name) {
                        schema
                            .keys
                            .entry(column.clone())
                            .or_insert_with(|| {
                                (KeySource::Inbound { group: group.clone() }, BTreeSet::new())
                            })
                            .1
                            .insert(source_table);
                    }
                    inbound
                        .entry((edge.target, column))
                        .or_insert_with(|| source.id.clone());
                }
            }
        }

        (inbound, junctions)
    }

    fn add_denormalized(
        &self,
        schemas: &mut BTreeMap<String, TableSchema>,
        columns: &mut HashMap<(String, String, String), String>,
        source_type: &str,
        field: &str,
        target: &IntermediateRecord,
    ) {
        let target_columns: Vec<(String, ColumnType)> = match schemas.get(&target.type_name) {
            Some(schema) => schema
                .scalars
                .iter()
                .map(|(name, ty)| (name.clone(), ty.clone()))
                .collect(),
            None => return,
        };

        for (target_field, ty) in target_columns {
            let key = (source_type.to_string(), field.to_string(), target_field.clone());
            if let Some(column) = columns.get(&key) {
                if let Some(schema) = schemas.get_mut(source_type) {
                    if let Some(entry) = schema.denormalized.get_mut(column) {
                        entry.2 = entry.2.merge(&ty).unwrap_or(ColumnType::Text);
                    }
                }
                continue;
            }
            let Some(schema) = schemas.get(source_type) else {
                return;
            };
            let column = self.unique_column(schema, &format!("{}_{}", field, target_field));
            columns.insert(key, column.clone());
            if let Some(schema) = schemas.get_mut(source_type) {
                schema
                    .denormalized
                    .insert(column, (field.to_string(), target_field, ty));
            }
        }
    }
}

/// One-to-many groups where every target points back at its source through
/// a single reference field. The target's own key column already holds the
/// pairing, so no inbound column is added for them.
fn mirrored_groups(arena: &RecordArena) -> HashSet<RelationGroup> {
    let mut back_fields: HashMap<RelationGroup, BTreeSet<String>> = HashMap::new();
    for (_, edge) in arena.live_edges() {
        if edge.cardinality != Cardinality::Many {
            continue;
        }
        let target = arena.record(edge.target);
        let fields: BTreeSet<String> = target
            .references
            .iter()
            .filter(|(_, field)| field.cardinality == Cardinality::One)
            .filter(|(_, field)| {
                field
                    .edges
                    .first()
                    .is_some_and(|&back| arena.edge(back).target == edge.source)
            })
            .map(|(name, _)| name.clone())
            .collect();
        back_fields
            .entry(arena.group_of(edge))
            .and_modify(|seen| seen.retain(|name| fields.contains(name)))
            .or_insert(fields);
    }
    back_fields
        .into_iter()
        .filter(|(_, fields)| !fields.is_empty())
        .map(|(group, _)| group)
        .collect()
}

/// Merge a record's scalar fields into the columns seen so far. All or
/// nothing: on the first conflict nothing is returned.
fn merged_columns(
    record: &IntermediateRecord,
    columns: &BTreeMap<String, ColumnType>,
) -> Result<Vec<(String, ColumnType)>, ConversionError> {
    let conflict = |field: &str, expected: String, found: String| ConversionError::SchemaConflict {
        identity: record.id.clone(),
        type_name: record.type_name.clone(),
        field: field.to_string(),
        expected,
        found,
    };

    let mut merged = Vec::with_capacity(record.scalars.len());
    for (field, value) in &record.scalars {
        let observed = ColumnType::of_field(value).ok_or_else(|| {
            conflict(field, "one item type".to_string(), "mixed item types".to_string())
        })?;
        let ty = match columns.get(field) {
            Some(existing) => existing
                .merge(&observed)
                .ok_or_else(|| conflict(field, existing.to_string(), observed.to_string()))?,
            None => observed,
        };
        merged.push((field.clone(), ty));
    }
    Ok(merged)
}

fn widen(scalar: &Scalar, column_type: &ColumnType) -> Scalar {
    match (scalar, column_type) {
        (Scalar::Int(i), ColumnType::Double) => Scalar::Float(*i as f64),
        (Scalar::Complex { real, imag }, _) => Scalar::Text(format!("{}{:+}i", real, imag)),
        _ => scalar.clone(),
    }
}

fn scalar_cell(field: Option<&ScalarField>, column_type: &ColumnType) -> Cell {
    match field {
        None | Some(ScalarField::Single(Scalar::Null)) => Cell::Empty,
        Some(ScalarField::Single(scalar)) => Cell::Scalar(widen(scalar, column_type)),
        Some(ScalarField::List { items, .. }) => {
            let item_type = match column_type {
                ColumnType::List(item) => item.as_ref(),
                other => other,
            };
            Cell::List(items.iter().map(|s| widen(s, item_type)).collect())
        }
        Some(ScalarField::Map(entries)) => {
            let value_type = match column_type {
                ColumnType::Map(value) => value.as_ref(),
                other => other,
            };
            Cell::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), widen(v, value_type)))
                    .collect(),
            )
        }
    }
}

impl Emitter for ColumnarEmitter {
    fn format(&self) -> TargetFormat {
        TargetFormat::Columnar
    }

    fn emit(&self, arena: &RecordArena) -> EmitOutput {
        let mut schemas: BTreeMap<String, TableSchema> = BTreeMap::new();
        let failures = self.merge_scalars(arena, &mut schemas);
        let mut taken_tables = self.name_tables(&mut schemas);
        for schema in schemas.values_mut() {
            self.name_scalar_columns(schema);
        }
        let (inbound, mut junctions) = self.add_relations(arena, &mut schemas, &mut taken_tables);

        // Final column layout per type
        let mut tables: BTreeMap<String, (Table, Vec<(String, KeySource)>)> = BTreeMap::new();
        for (type_name, schema) in &schemas {
            let mut columns = vec![Column {
                name: self.ident("id"),
                data_type: ColumnType::Text,
                kind: ColumnKind::PrimaryKey,
                references: BTreeSet::new(),
            }];
            columns.extend(schema.scalars.iter().map(|(field, ty)| Column {
                name: schema
                    .columns
                    .get(field)
                    .cloned()
                    .unwrap_or_else(|| self.ident(field)),
                data_type: ty.clone().finalize(),
                kind: ColumnKind::Scalar,
                references: BTreeSet::new(),
            }));
            let mut keys = Vec::with_capacity(schema.keys.len());
            for (name, (source, references)) in &schema.keys {
                columns.push(Column {
                    name: name.clone(),
                    data_type: ColumnType::Text,
                    kind: ColumnKind::ForeignKey,
                    references: references.clone(),
                });
                keys.push((name.clone(), source.clone()));
            }
            columns.extend(schema.denormalized.iter().map(|(name, (_, _, ty))| Column {
                name: name.clone(),
                data_type: ty.clone().finalize(),
                kind: ColumnKind::Denormalized,
                references: BTreeSet::new(),
            }));

            tables.insert(
                type_name.clone(),
                (
                    Table {
                        name: schema.name.clone(),
                        type_name: type_name.clone(),
                        columns,
                        rows: Vec::new(),
                    },
                    keys,
                ),
            );
        }

        let mut results = Vec::with_capacity(arena.len());
        for (idx, record) in arena.records().iter().enumerate() {
            let failure = record_failure(record).or_else(|| failures.get(&idx).cloned());
            if let Some(failure) = failure {
                results.push(ConversionResult::failure(
                    record.id.clone(),
                    TargetFormat::Columnar,
                    failure,
                ));
                continue;
            }
            let (Some(schema), Some((table, keys))) =
                (schemas.get(&record.type_name), tables.get_mut(&record.type_name))
            else {
                continue;
            };

            let mut row = Vec::with_capacity(table.width());
            row.push(Cell::Identity(record.id.clone()));
            for (field, ty) in &schema.scalars {
                row.push(scalar_cell(record.scalars.get(field), ty));
            }
            for (column, source) in keys.iter() {
                let cell = match source {
                    KeySource::Outgoing { field } => record
                        .references
                        .get(field)
                        .and_then(|f| f.edges.first())
                        .map(|&e| Cell::Identity(arena.record(arena.edge(e).target).id.clone()))
                        .unwrap_or(Cell::Empty),
                    KeySource::Inbound { .. } => inbound
                        .get(&(idx, column.clone()))
                        .map(|id| Cell::Identity(id.clone()))
                        .unwrap_or(Cell::Empty),
                };
                row.push(cell);
            }
            for (field, target_field, ty) in schema.denormalized.values() {
                let value = record
                    .references
                    .get(field)
                    .and_then(|f| f.edges.first())
                    .map(|&e| arena.edge(e))
                    .filter(|edge| edge.class == EdgeClass::Denormalize)
                    .and_then(|edge| arena.record(edge.target).scalars.get(target_field));
                row.push(scalar_cell(value, ty));
            }

            let mut junction_rows = Vec::new();
            for field in record.references.values() {
                for &edge_idx in &field.edges {
                    let edge = arena.edge(edge_idx);
                    let group = arena.group_of(edge);
                    let Some(junction) = junctions.get_mut(&group) else {
                        continue;
                    };
                    let pair = (record.id.clone(), arena.record(edge.target).id.clone());
                    if junction.seen.insert(pair.clone()) {
                        junction_rows.push(JunctionRow {
                            table: junction.table.name.clone(),
                            source: pair.0.clone(),
                            target: pair.1.clone(),
                        });
                        junction.table.rows.push(pair);
                    }
                }
            }

            table.rows.push(row.clone());
            results.push(ConversionResult::success(
                record.id.clone(),
                TargetFormat::Columnar,
                Payload::Columnar(RowFragment {
                    table: table.name.clone(),
                    row,
                    junction_rows,
                }),
            ));
        }

        let mut dataset = ColumnarDataset {
            tables: tables.into_values().map(|(table, _)| table).collect(),
            junction_tables: junctions.into_values().map(|j| j.table).collect(),
        };
        dataset.tables.sort_by(|a, b| a.name.cmp(&b.name));
        dataset.junction_tables.sort_by(|a, b| a.name.cmp(&b.name));

        let conflicts = results
            .iter()
            .filter_map(ConversionResult::failure_info)
            .filter(|f| f.kind == ErrorKind::SchemaConflict)
            .count();
        info!(
            "Emitted {} tables and {} junction tables ({} schema conflicts)",
            dataset.tables.len(),
            dataset.junction_tables.len(),
            conflicts
        );
        EmitOutput {
            results,
            output: TargetOutput::Columnar(dataset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::config::ResolverOptions;
    use crate::models::{FieldValue, ObjectInstance, ObjectModel};
    use crate::reader::ObjectReader;
    use crate::resolver::ReferenceResolver;

    fn emit_tables(model: &ObjectModel, roots: &[&str]) -> ColumnarDataset {
        let roots: Vec<ObjectId> = roots.iter().map(|r| ObjectId::from(*r)).collect();
        let mut arena = ObjectReader::default().read(model, &roots).unwrap();
        ReferenceResolver::new(ResolverOptions::default()).resolve(&mut arena);
        match ColumnarEmitter::default().emit(&arena).output {
            TargetOutput::Columnar(dataset) => dataset,
            _ => panic!("expected a columnar dataset"),
        }
    }

    fn names(table: &Table) -> Vec<&str> {
        table.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_merge_widens_numbers() {
        assert_eq!(
            ColumnType::BigInt.merge(&ColumnType::Double),
            Some(ColumnType::Double)
        );
        assert_eq!(
            ColumnType::Unknown.merge(&ColumnType::Text),
            Some(ColumnType::Text)
        );
        assert_eq!(ColumnType::Text.merge(&ColumnType::BigInt), None);
        assert_eq!(
            ColumnType::List(Box::new(ColumnType::BigInt))
                .merge(&ColumnType::List(Box::new(ColumnType::Double))),
            Some(ColumnType::List(Box::new(ColumnType::Double)))
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ColumnType::List(Box::new(ColumnType::Text)).to_string(), "list<text>");
        assert_eq!(
            ColumnType::Map(Box::new(ColumnType::BigInt)).to_string(),
            "map<text, bigint>"
        );
        assert_eq!(
            ColumnType::List(Box::new(ColumnType::Unknown)).finalize(),
            ColumnType::List(Box::new(ColumnType::Text))
        );
    }

    #[test]
    fn test_field_types() {
        let mixed = ScalarField::List {
            ordered: true,
            items: vec![Scalar::Int(1), Scalar::Text("a".to_string())],
        };
        assert_eq!(ColumnType::of_field(&mixed), None);

        let complex = ScalarField::Single(Scalar::Complex { real: 1.0, imag: 0.5 });
        assert_eq!(ColumnType::of_field(&complex), Some(ColumnType::Text));
    }

    #[test]
    fn test_cells_widen_into_double_columns() {
        let cell = scalar_cell(Some(&ScalarField::Single(Scalar::Int(3))), &ColumnType::Double);
        assert_eq!(cell, Cell::Scalar(Scalar::Float(3.0)));
        assert_eq!(scalar_cell(None, &ColumnType::Text), Cell::Empty);
        assert_eq!(Cell::Empty.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_complex_cells_are_text() {
        let field = ScalarField::Single(Scalar::Complex { real: 1.5, imag: -2.0 });
        let cell = scalar_cell(Some(&field), &ColumnType::Text);
        assert_eq!(cell, Cell::Scalar(Scalar::Text("1.5-2i".to_string())));
        assert_eq!(cell.to_json(), serde_json::json!("1.5-2i"));

        let list = ScalarField::List {
            ordered: true,
            items: vec![Scalar::Complex { real: 0.0, imag: 0.5 }],
        };
        assert_eq!(
            scalar_cell(Some(&list), &ColumnType::List(Box::new(ColumnType::Text))),
            Cell::List(vec![Scalar::Text("0+0.5i".to_string())])
        );
    }

    #[test]
    fn test_scalar_columns_never_collide() {
        let model: ObjectModel = [ObjectInstance::new("b1", "Book")
            .with_field("id", 42i64)
            .with_field("_id", "legacy")
            .with_field("a b", "x")
            .with_field("a_b", "y")]
        .into_iter()
        .collect();

        let dataset = emit_tables(&model, &["b1"]);
        let books = dataset.table("Book").unwrap();
        assert_eq!(names(books), vec!["id", "_id", "a_b", "a_b_2", "id_2"]);
        assert_eq!(
            books.rows[0],
            vec![
                Cell::Identity(ObjectId::from("b1")),
                Cell::Scalar(Scalar::Text("legacy".to_string())),
                Cell::Scalar(Scalar::Text("x".to_string())),
                Cell::Scalar(Scalar::Text("y".to_string())),
                Cell::Scalar(Scalar::Int(42)),
            ]
        );
    }

    #[test]
    fn test_table_and_junction_names_never_collide() {
        let model: ObjectModel = [
            ObjectInstance::new("m1", "Team Member")
                .with_field("skills", FieldValue::references(["s1"])),
            ObjectInstance::new("m2", "Team_Member")
                .with_field("skills", FieldValue::references(["s1"])),
            ObjectInstance::new("m3", "Team Member")
                .with_field("skills", FieldValue::references(["s1"])),
            ObjectInstance::new("m4", "Team_Member")
                .with_field("skills", FieldValue::references(["s1"])),
            ObjectInstance::new("s1", "Skill"),
            ObjectInstance::new("x1", "team_member_skills"),
        ]
        .into_iter()
        .collect();

        let dataset = emit_tables(&model, &["m1", "m2", "m3", "m4", "x1"]);
        let tables: Vec<&str> = dataset.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            tables,
            vec!["Skill", "Team_Member", "Team_Member_2", "team_member_skills"]
        );
        assert_eq!(dataset.table("Team_Member").unwrap().type_name, "Team Member");
        assert_eq!(dataset.table("Team_Member").unwrap().rows.len(), 2);
        assert_eq!(dataset.table("Team_Member_2").unwrap().type_name, "Team_Member");

        let junctions: Vec<&str> = dataset
            .junction_tables
            .iter()
            .map(|j| j.name.as_str())
            .collect();
        assert_eq!(junctions, vec!["team_member_skills_2", "team_member_skills_3"]);
    }

    #[test]
    fn test_mirrored_one_to_many_has_no_inbound_column() {
        let model: ObjectModel = [
            ObjectInstance::new("t1", "Team")
                .with_field("players", FieldValue::references(["p1", "p2"])),
            ObjectInstance::new("p1", "Player").with_field("team", FieldValue::reference("t1")),
            ObjectInstance::new("p2", "Player"),
            ObjectInstance::new("c1", "Club")
                .with_field("members", FieldValue::references(["p1"])),
        ]
        .into_iter()
        .collect();

        // p2 has no back reference, so Team.players keeps its inbound key
        let dataset = emit_tables(&model, &["t1", "c1"]);
        assert_eq!(
            names(dataset.table("Player").unwrap()),
            vec!["id", "club_members_id", "team_id", "team_players_id"]
        );

        let mirrored: ObjectModel = [
            ObjectInstance::new("t1", "Team")
                .with_field("players", FieldValue::references(["p1"])),
            ObjectInstance::new("p1", "Player").with_field("team", FieldValue::reference("t1")),
        ]
        .into_iter()
        .collect();
        let dataset = emit_tables(&mirrored, &["t1"]);
        assert_eq!(names(dataset.table("Player").unwrap()), vec!["id", "team_id"]);
    }
}
