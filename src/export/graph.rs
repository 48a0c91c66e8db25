//! Graph emitter
//!
//! Every successful record becomes one node; every reference edge between
//! two successful records becomes one directed edge. Inlined edges carry a
//! copy of the target's scalar properties.

use super::{EmitOutput, Emitter, TargetOutput, record_failure};
use crate::convert::config::{EdgeLabelStyle, GraphOptions};
use crate::models::{
    ConversionResult, GraphEdge, GraphFragment, GraphNode, IntermediateRecord, ObjectId, Payload,
    RecordArena, ReferenceEdge, TargetFormat,
};
use crate::validation::input::sanitize_identifier;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Node and edge lists ready for bulk loading
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphEmitter {
    options: GraphOptions,
}

impl GraphEmitter {
    pub fn new(options: GraphOptions) -> Self {
        Self { options }
    }

    /// Edge label for a field under the configured style
    pub fn edge_label(&self, field: &str) -> String {
        match self.options.edge_label_style {
            EdgeLabelStyle::FieldName => field.to_string(),
            EdgeLabelStyle::Relationship => {
                format!("HAS_{}", sanitize_identifier(field, false).to_uppercase())
            }
        }
    }

    /// Deterministic edge identity
    ///
    /// Derived from the source identity, field and position so that the
    /// same model always yields the same edge ids.
    pub fn edge_id(source: &ObjectId, field: &str, position: usize) -> Uuid {
        let key = format!("{}:{}:{}", source, field, position);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }

    fn node(record: &IntermediateRecord) -> GraphNode {
        GraphNode {
            id: record.id.clone(),
            labels: record.labels(),
            properties: properties(record),
        }
    }

    fn edge(&self, arena: &RecordArena, edge: &ReferenceEdge) -> GraphEdge {
        let source = arena.record(edge.source);
        let target = arena.record(edge.target);
        GraphEdge {
            id: Self::edge_id(&source.id, &edge.field, edge.position),
            source: source.id.clone(),
            target: target.id.clone(),
            label: self.edge_label(&edge.field),
            properties: if edge.class.is_inlined() {
                properties(target)
            } else {
                BTreeMap::new()
            },
        }
    }
}

fn properties(record: &IntermediateRecord) -> BTreeMap<String, serde_json::Value> {
    record
        .scalars
        .iter()
        .filter(|(_, field)| !field.is_null())
        .map(|(name, field)| (name.clone(), field.to_json()))
        .collect()
}

impl Emitter for GraphEmitter {
    fn format(&self) -> TargetFormat {
        TargetFormat::Graph
    }

    fn emit(&self, arena: &RecordArena) -> EmitOutput {
        let mut results = Vec::with_capacity(arena.len());
        let mut graph = PropertyGraph::default();

        for record in arena.records() {
            if let Some(failure) = record_failure(record) {
                results.push(ConversionResult::failure(
                    record.id.clone(),
                    TargetFormat::Graph,
                    failure,
                ));
                continue;
            }

            let mut edges = Vec::new();
            for field in record.references.values() {
                for &edge_idx in &field.edges {
                    let edge = arena.edge(edge_idx);
                    let target = arena.record(edge.target);
                    if target.is_failed() {
                        warn!(
                            "Dropping edge {}.{} -> {}: target failed",
                            record.id, edge.field, target.id
                        );
                        continue;
                    }
                    edges.push(self.edge(arena, edge));
                }
            }

            let fragment = GraphFragment {
                node: Self::node(record),
                edges,
            };
            graph.nodes.push(fragment.node.clone());
            graph.edges.extend(fragment.edges.iter().cloned());
            results.push(ConversionResult::success(
                record.id.clone(),
                TargetFormat::Graph,
                Payload::Graph(fragment),
            ));
        }

        info!(
            "Emitted {} nodes and {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        EmitOutput {
            results,
            output: TargetOutput::Graph(graph),
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
    use serde_json::json;

    fn emit(model: &ObjectModel, roots: &[&str], options: GraphOptions) -> PropertyGraph {
        let roots: Vec<ObjectId> = roots.iter().map(|r| ObjectId::from(*r)).collect();
        let mut arena = ObjectReader::default().read(model, &roots).unwrap();
        ReferenceResolver::new(ResolverOptions::default()).resolve(&mut arena);
        match GraphEmitter::new(options).emit(&arena).output {
            TargetOutput::Graph(graph) => graph,
            other => panic!("unexpected output {:?}", other),
        }
    }

    fn team_model() -> ObjectModel {
        [
            ObjectInstance::new("t1", "Team")
                .with_supertypes(["Organisation"])
                .with_field("name", "Lions")
                .with_field("players", FieldValue::references(["p1", "p2"])),
            ObjectInstance::new("p1", "Player")
                .with_field("name", "Ann")
                .with_field("nickname", FieldValue::null()),
            ObjectInstance::new("p2", "Player").with_field("name", "Bob"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_nodes_and_parallel_edges() {
        let graph = emit(&team_model(), &["t1"], GraphOptions::default());

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.nodes[0].labels, vec!["Team", "Organisation"]);
        assert!(!graph.nodes[1].properties.contains_key("nickname"));
        assert_eq!(graph.edges[0].label, "players");
        // embedded targets copy their scalars onto the edge
        assert_eq!(graph.edges[0].properties["name"], json!("Ann"));
    }

    #[test]
    fn test_relationship_labels() {
        let options = GraphOptions {
            edge_label_style: EdgeLabelStyle::Relationship,
        };
        let graph = emit(&team_model(), &["t1"], options);
        assert_eq!(graph.edges[0].label, "HAS_PLAYERS");
    }

    #[test]
    fn test_edge_ids_are_deterministic() {
        let first = emit(&team_model(), &["t1"], GraphOptions::default());
        let second = emit(&team_model(), &["t1"], GraphOptions::default());
        assert_eq!(first.edges[1].id, second.edges[1].id);
        assert_ne!(first.edges[0].id, first.edges[1].id);
        assert_eq!(
            first.edges[0].id,
            GraphEmitter::edge_id(&ObjectId::from("t1"), "players", 0)
        );
    }
}
