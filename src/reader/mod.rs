//! Object model reader
//!
//! Walks an [`ObjectModel`] depth-first from the given roots and builds the
//! [`RecordArena`]. Fields are visited in sorted order and collection items
//! in stored order, so the arena layout depends only on the model and the
//! root order.

use crate::convert::config::{TraversalOptions, UnresolvedPolicy};
use crate::convert::error::{ConversionError, TraversalLimit};
use crate::models::{
    Cardinality, EdgeClass, FieldValue, IntermediateRecord, ObjectId, ObjectInstance, ObjectModel,
    ObjectRef, RecordArena, RecordIdx, RecordStatus, ReferenceEdge, ReferenceField, ScalarField,
};
use crate::validation::input::{validate_field_name, validate_object_id, validate_type_name};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Reads an object graph into the intermediate representation
#[derive(Debug, Clone, Default)]
pub struct ObjectReader {
    options: TraversalOptions,
}

struct PendingRef {
    field: String,
    target: ObjectRef,
    cardinality: Cardinality,
    position: usize,
}

struct Frame {
    record: RecordIdx,
    pending: std::vec::IntoIter<PendingRef>,
}

impl ObjectReader {
    pub fn new(options: TraversalOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Traverse `model` from `roots`.
    ///
    /// Returns `MalformedInput` when the roots or any instance fail
    /// validation. Per-entity problems (missing targets, traversal bounds)
    /// are recorded on the affected records instead.
    pub fn read(
        &self,
        model: &ObjectModel,
        roots: &[ObjectId],
    ) -> Result<RecordArena, ConversionError> {
        validate_model(model, roots)?;

        let mut traversal = Traversal {
            model,
            options: &self.options,
            arena: RecordArena::new(),
            on_path: HashSet::new(),
        };

        for root in roots {
            if let Some(existing) = traversal.arena.lookup(root) {
                traversal.arena.mark_root(existing);
                continue;
            }
            // validate_model guarantees every root exists
            let Some(instance) = model.get(root) else {
                continue;
            };
            let (idx, pending) = traversal.enter(instance, 0);
            traversal.arena.mark_root(idx);
            if let Some(pending) = pending {
                traversal.walk(idx, pending);
            }
        }

        let arena = traversal.arena;
        let failed = arena.records().iter().filter(|r| r.is_failed()).count();
        info!(
            "Read {} records and {} edges from {} roots ({} failed)",
            arena.len(),
            arena.edges().len(),
            arena.roots().len(),
            failed
        );
        Ok(arena)
    }
}

struct Traversal<'a> {
    model: &'a ObjectModel,
    options: &'a TraversalOptions,
    arena: RecordArena,
    on_path: HashSet<RecordIdx>,
}

impl Traversal<'_> {
    /// Create the record for `instance`, or a bound-failed placeholder.
    /// Returns the references still to follow when the record is complete.
    fn enter(
        &mut self,
        instance: &ObjectInstance,
        depth: usize,
    ) -> (RecordIdx, Option<Vec<PendingRef>>) {
        let limit = if depth > self.options.max_depth {
            Some(TraversalLimit::Depth {
                max: self.options.max_depth,
            })
        } else if self.arena.len() >= self.options.max_records {
            Some(TraversalLimit::Records {
                max: self.options.max_records,
            })
        } else {
            None
        };

        let mut record = IntermediateRecord::new(instance.id.clone(), &instance.type_name, depth);
        record.supertypes = instance.supertypes.clone();

        if let Some(limit) = limit {
            warn!("Traversal stopped at {} ({})", instance.id, limit);
            record.status = RecordStatus::Failed(ConversionError::BoundedTraversalExceeded {
                identity: instance.id.clone(),
                limit,
            });
            return (self.arena.push_record(record), None);
        }

        let mut pending = Vec::new();
        for (name, value) in &instance.fields {
            match value {
                FieldValue::Scalar(scalar) => {
                    record
                        .scalars
                        .insert(name.clone(), ScalarField::Single(scalar.clone()));
                }
                FieldValue::Scalars { ordered, items } => {
                    record.scalars.insert(
                        name.clone(),
                        ScalarField::List {
                            ordered: *ordered,
                            items: items.clone(),
                        },
                    );
                }
                FieldValue::Map(entries) => {
                    record
                        .scalars
                        .insert(name.clone(), ScalarField::Map(entries.clone()));
                }
                FieldValue::Reference(target) => {
                    record.references.insert(
                        name.clone(),
                        ReferenceField {
                            cardinality: Cardinality::One,
                            ordered: true,
                            edges: Vec::new(),
                        },
                    );
                    pending.push(PendingRef {
                        field: name.clone(),
                        target: target.clone(),
                        cardinality: Cardinality::One,
                        position: 0,
                    });
                }
                FieldValue::References { ordered, items } => {
                    record.references.insert(
                        name.clone(),
                        ReferenceField {
                            cardinality: Cardinality::Many,
                            ordered: *ordered,
                            edges: Vec::new(),
                        },
                    );
                    pending.extend(items.iter().enumerate().map(|(position, target)| {
                        PendingRef {
                            field: name.clone(),
                            target: target.clone(),
                            cardinality: Cardinality::Many,
                            position,
                        }
                    }));
                }
            }
        }

        (self.arena.push_record(record), Some(pending))
    }

    fn walk(&mut self, start: RecordIdx, pending: Vec<PendingRef>) {
        let mut stack = vec![Frame {
            record: start,
            pending: pending.into_iter(),
        }];
        self.on_path.insert(start);

        while let Some(frame) = stack.last_mut() {
            let source = frame.record;
            let Some(next) = frame.pending.next() else {
                self.on_path.remove(&source);
                stack.pop();
                continue;
            };

            if let Some(child) = self.follow(source, next) {
                let pending = child.1;
                self.on_path.insert(child.0);
                stack.push(Frame {
                    record: child.0,
                    pending: pending.into_iter(),
                });
            }
        }
    }

    /// Record the edge for one reference. Returns the newly entered target
    /// when it has references of its own to follow.
    fn follow(
        &mut self,
        source: RecordIdx,
        reference: PendingRef,
    ) -> Option<(RecordIdx, Vec<PendingRef>)> {
        let depth = self.arena.record(source).depth + 1;
        let mut entered = None;

        let target = match self.arena.lookup(&reference.target.id) {
            Some(existing) => existing,
            None => match self.model.get(&reference.target.id) {
                Some(instance) => {
                    let (idx, pending) = self.enter(instance, depth);
                    entered = pending.map(|p| (idx, p));
                    idx
                }
                None => match self.options.unresolved {
                    UnresolvedPolicy::Fail => {
                        let record = self.arena.record_mut(source);
                        warn!(
                            "Unresolved reference {}.{} -> {}",
                            record.id, reference.field, reference.target.id
                        );
                        let referrer = record.id.clone();
                        record.fail(ConversionError::UnresolvedReference {
                            referrer,
                            field: reference.field,
                            target: reference.target.id,
                        });
                        return None;
                    }
                    UnresolvedPolicy::Stub => {
                        let type_name = reference
                            .target
                            .type_hint
                            .clone()
                            .unwrap_or_else(|| self.options.stub_type.clone());
                        debug!(
                            "Stubbing missing target {} as {}",
                            reference.target.id, type_name
                        );
                        self.arena.push_record(IntermediateRecord::stub(
                            reference.target.id.clone(),
                            type_name,
                            depth,
                        ))
                    }
                },
            },
        };

        let back_edge = self.on_path.contains(&target);
        self.arena.push_edge(ReferenceEdge {
            source,
            field: reference.field,
            target,
            cardinality: reference.cardinality,
            position: reference.position,
            back_edge,
            class: EdgeClass::Link,
        });

        entered
    }
}

fn validate_model(model: &ObjectModel, roots: &[ObjectId]) -> Result<(), ConversionError> {
    if roots.is_empty() {
        return Err(ConversionError::MalformedInput(
            "At least one root identity is required".to_string(),
        ));
    }
    for root in roots {
        if !model.contains(root) {
            return Err(ConversionError::MalformedInput(format!(
                "Root '{}' is not part of the model",
                root
            )));
        }
    }

    for instance in model.iter() {
        let malformed =
            |reason: String| ConversionError::MalformedInput(format!("Object '{}': {}", instance.id, reason));

        validate_object_id(instance.id.as_str()).map_err(|e| malformed(e.to_string()))?;
        validate_type_name(&instance.type_name).map_err(|e| malformed(e.to_string()))?;
        for supertype in &instance.supertypes {
            validate_type_name(supertype).map_err(|e| malformed(e.to_string()))?;
        }
        for (name, value) in &instance.fields {
            validate_field_name(name).map_err(|e| malformed(e.to_string()))?;
            let targets: &[ObjectRef] = match value {
                FieldValue::Reference(target) => std::slice::from_ref(target),
                FieldValue::References { items, .. } => items,
                _ => &[],
            };
            for target in targets {
                validate_object_id(target.id.as_str())
                    .map_err(|e| malformed(format!("field '{}': {}", name, e)))?;
                if let Some(hint) = &target.type_hint {
                    validate_type_name(hint)
                        .map_err(|e| malformed(format!("field '{}': {}", name, e)))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::error::ErrorKind;

    fn team_model() -> ObjectModel {
        [
            ObjectInstance::new("t1", "Team")
                .with_field("name", "Lions")
                .with_field("players", FieldValue::references(["p1", "p2"])),
            ObjectInstance::new("p1", "Player")
                .with_field("name", "Ann")
                .with_field("team", FieldValue::reference("t1")),
            ObjectInstance::new("p2", "Player")
                .with_field("name", "Bob")
                .with_field("team", FieldValue::reference("t1")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_depth_first_order() {
        let arena = ObjectReader::default()
            .read(&team_model(), &[ObjectId::from("t1")])
            .unwrap();

        let ids: Vec<&str> = arena.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "p1", "p2"]);
        assert_eq!(arena.edges().len(), 4);
        assert_eq!(arena.record(1).depth, 1);
    }

    #[test]
    fn test_back_edges_marked() {
        let arena = ObjectReader::default()
            .read(&team_model(), &[ObjectId::from("t1")])
            .unwrap();

        let back: Vec<bool> = arena.edges().iter().map(|e| e.back_edge).collect();
        // t1.players[0], p1.team (back), t1.players[1], p2.team (back)
        assert_eq!(back, vec![false, true, false, true]);
    }

    #[test]
    fn test_unresolved_reference_fails_source() {
        let mut model = team_model();
        model.insert(
            ObjectInstance::new("p3", "Player").with_field("team", FieldValue::reference("t9")),
        );
        let arena = ObjectReader::default()
            .read(&model, &[ObjectId::from("p3")])
            .unwrap();

        let p3 = arena.record_by_id(&ObjectId::from("p3")).unwrap();
        assert_eq!(
            p3.error().and_then(|e| e.kind()),
            Some(ErrorKind::UnresolvedReference)
        );
        assert!(arena.edges().is_empty());
    }

    #[test]
    fn test_stub_policy_creates_stub() {
        let model: ObjectModel = [ObjectInstance::new("p3", "Player").with_field(
            "team",
            FieldValue::Reference(ObjectRef::new("t9").with_type_hint("Team")),
        )]
        .into_iter()
        .collect();
        let options = TraversalOptions {
            unresolved: UnresolvedPolicy::Stub,
            ..Default::default()
        };
        let arena = ObjectReader::new(options)
            .read(&model, &[ObjectId::from("p3")])
            .unwrap();

        let stub = arena.record_by_id(&ObjectId::from("t9")).unwrap();
        assert!(stub.is_stub());
        assert_eq!(stub.type_name, "Team");
        assert!(!arena.record(0).is_failed());
        assert_eq!(arena.edges().len(), 1);
    }

    #[test]
    fn test_depth_bound() {
        let model: ObjectModel = [
            ObjectInstance::new("a", "Node").with_field("next", FieldValue::reference("b")),
            ObjectInstance::new("b", "Node").with_field("next", FieldValue::reference("c")),
            ObjectInstance::new("c", "Node").with_field("next", FieldValue::reference("d")),
            ObjectInstance::new("d", "Node"),
        ]
        .into_iter()
        .collect();
        let options = TraversalOptions {
            max_depth: 1,
            ..Default::default()
        };
        let arena = ObjectReader::new(options)
            .read(&model, &[ObjectId::from("a")])
            .unwrap();

        assert_eq!(arena.len(), 3);
        let c = arena.record_by_id(&ObjectId::from("c")).unwrap();
        assert_eq!(
            c.error().and_then(|e| e.kind()),
            Some(ErrorKind::BoundedTraversalExceeded)
        );
        assert!(arena.record_by_id(&ObjectId::from("d")).is_none());
    }

    #[test]
    fn test_record_bound() {
        let model: ObjectModel = [
            ObjectInstance::new("a", "Node").with_field("next", FieldValue::reference("b")),
            ObjectInstance::new("b", "Node").with_field("next", FieldValue::reference("c")),
            ObjectInstance::new("c", "Node").with_field("next", FieldValue::reference("d")),
            ObjectInstance::new("d", "Node"),
        ]
        .into_iter()
        .collect();
        let options = TraversalOptions {
            max_records: 2,
            ..Default::default()
        };
        let arena = ObjectReader::new(options)
            .read(&model, &[ObjectId::from("a")])
            .unwrap();

        assert_eq!(arena.len(), 3);
        assert!(!arena.record_by_id(&ObjectId::from("b")).unwrap().is_failed());
        let c = arena.record_by_id(&ObjectId::from("c")).unwrap();
        assert!(matches!(
            c.error(),
            Some(ConversionError::BoundedTraversalExceeded {
                limit: TraversalLimit::Records { max: 2 },
                ..
            })
        ));
        // the bound record keeps no fields and its subtree is never walked
        assert!(c.references.is_empty());
        assert!(arena.record_by_id(&ObjectId::from("d")).is_none());
        assert_eq!(arena.edges().len(), 2);
    }

    #[test]
    fn test_malformed_inputs() {
        let model = team_model();
        let reader = ObjectReader::default();

        assert!(matches!(
            reader.read(&model, &[]),
            Err(ConversionError::MalformedInput(_))
        ));
        assert!(matches!(
            reader.read(&model, &[ObjectId::from("nope")]),
            Err(ConversionError::MalformedInput(_))
        ));

        let bad: ObjectModel = [ObjectInstance::new("x", "9Bad")].into_iter().collect();
        assert!(matches!(
            reader.read(&bad, &[ObjectId::from("x")]),
            Err(ConversionError::MalformedInput(_))
        ));

        let empty_field: ObjectModel = [ObjectInstance::new("x", "Ok").with_field("", 1i64)]
            .into_iter()
            .collect();
        assert!(reader.read(&empty_field, &[ObjectId::from("x")]).is_err());
    }

    #[test]
    fn test_self_reference_is_back_edge() {
        let model: ObjectModel =
            [ObjectInstance::new("n", "Node").with_field("me", FieldValue::reference("n"))]
                .into_iter()
                .collect();
        let arena = ObjectReader::default()
            .read(&model, &[ObjectId::from("n")])
            .unwrap();

        assert_eq!(arena.len(), 1);
        assert!(arena.edge(0).back_edge);
        assert_eq!(arena.edge(0).source, arena.edge(0).target);
    }
}
