//! Reference resolver
//!
//! Annotates a [`RecordArena`] in place: checks that every type keeps a
//! fixed shape per field, classifies each edge as embed, link or
//! denormalize, and derives the relation kind of every (source type, field)
//! group. The classification is computed once and shared by all emitters.

use crate::convert::config::ResolverOptions;
use crate::convert::error::ConversionError;
use crate::models::{
    Cardinality, EdgeClass, EdgeIdx, FieldShape, RecordArena, RecordIdx, RelationGroup,
    RelationKind,
};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Counts produced by one resolver pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveStats {
    pub embedded: usize,
    pub linked: usize,
    pub denormalized: usize,
    /// Edges demoted to link because they closed an inlining cycle
    pub demoted: usize,
    pub schema_conflicts: usize,
}

/// Classifies reference edges
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    options: ResolverOptions,
}

impl ReferenceResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn resolve(&self, arena: &mut RecordArena) -> ResolveStats {
        let mut stats = ResolveStats {
            schema_conflicts: check_shapes(arena),
            ..Default::default()
        };

        let live: Vec<EdgeIdx> = arena.live_edges().map(|(idx, _)| idx).collect();
        let graph = ReferenceGraph::build(arena, &live);

        // Which groups reference each target type
        let mut referrers: HashMap<&str, BTreeSet<RelationGroup>> = HashMap::new();
        for &idx in &live {
            let edge = arena.edge(idx);
            referrers
                .entry(arena.record(edge.target).type_name.as_str())
                .or_default()
                .insert(arena.group_of(edge));
        }

        let mut classes = Vec::with_capacity(live.len());
        for &idx in &live {
            let edge = arena.edge(idx);
            let target = arena.record(edge.target);
            // Self references, back edges and unusable targets are never inlined
            let class = if edge.source == edge.target
                || edge.back_edge
                || target.is_failed()
                || target.is_stub()
            {
                EdgeClass::Link
            } else {
                match edge.cardinality {
                    Cardinality::One if graph.inbound(edge.target) == 1 => {
                        if self.options.denormalize_one_to_one {
                            EdgeClass::Denormalize
                        } else {
                            EdgeClass::Embed
                        }
                    }
                    Cardinality::Many
                        if referrers
                            .get(target.type_name.as_str())
                            .is_some_and(|groups| groups.len() == 1) =>
                    {
                        EdgeClass::Embed
                    }
                    _ => EdgeClass::Link,
                }
            };
            debug!(
                "{}.{}[{}] -> {}: {}",
                arena.record(edge.source).id,
                edge.field,
                edge.position,
                target.id,
                class
            );
            classes.push((idx, class));
        }

        for (idx, class) in classes {
            arena.edge_mut(idx).class = class;
        }
        stats.demoted = break_inline_cycles(arena, &live);

        for &idx in &live {
            match arena.edge(idx).class {
                EdgeClass::Embed => stats.embedded += 1,
                EdgeClass::Link => stats.linked += 1,
                EdgeClass::Denormalize => stats.denormalized += 1,
            }
        }

        for (group, kind) in relation_kinds(arena, &live) {
            debug!("Relation {} is {}", group, kind);
            arena.set_relation(group, kind);
        }

        info!(
            "Resolved {} edges: {} embed, {} link, {} denormalize ({} schema conflicts)",
            live.len(),
            stats.embedded,
            stats.linked,
            stats.denormalized,
            stats.schema_conflicts
        );
        stats
    }
}

/// Petgraph view of the live edges, one node per record
struct ReferenceGraph {
    graph: DiGraph<RecordIdx, EdgeIdx>,
}

impl ReferenceGraph {
    fn build(arena: &RecordArena, edges: &[EdgeIdx]) -> Self {
        let mut graph = DiGraph::with_capacity(arena.len(), edges.len());
        for idx in 0..arena.len() {
            graph.add_node(idx);
        }
        for &idx in edges {
            let edge = arena.edge(idx);
            graph.add_edge(NodeIndex::new(edge.source), NodeIndex::new(edge.target), idx);
        }
        Self { graph }
    }

    fn inbound(&self, record: RecordIdx) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(record), Direction::Incoming)
            .count()
    }
}

/// Fix each (type, field) shape from the first record that shows it
/// definitely, and fail later records that disagree.
fn check_shapes(arena: &mut RecordArena) -> usize {
    let mut declared: HashMap<String, BTreeMap<String, FieldShape>> = HashMap::new();
    let mut conflicts = Vec::new();

    for (idx, record) in arena.records().iter().enumerate() {
        if record.is_stub() {
            continue;
        }
        let shapes = declared.entry(record.type_name.clone()).or_default();
        for (field, observed) in record.field_shapes() {
            match shapes.get(field).copied() {
                Some(expected) if expected.is_definite() => {
                    if !observed.fits(expected) {
                        conflicts.push((
                            idx,
                            ConversionError::SchemaConflict {
                                identity: record.id.clone(),
                                type_name: record.type_name.clone(),
                                field: field.to_string(),
                                expected: expected.to_string(),
                                found: observed.to_string(),
                            },
                        ));
                    }
                }
                _ => {
                    if observed.is_definite() || !shapes.contains_key(field) {
                        shapes.insert(field.to_string(), observed);
                    }
                }
            }
        }
    }

    let count = conflicts.len();
    for (idx, error) in conflicts {
        warn!("{}", error);
        arena.record_mut(idx).fail(error);
    }
    count
}

/// Demote inlined edges that lie on a cycle of inlined edges. Returns the
/// number of demoted edges.
fn break_inline_cycles(arena: &mut RecordArena, live: &[EdgeIdx]) -> usize {
    let inlined: Vec<EdgeIdx> = live
        .iter()
        .copied()
        .filter(|&idx| arena.edge(idx).class.is_inlined())
        .collect();
    let graph = ReferenceGraph::build(arena, &inlined);

    let mut component = vec![usize::MAX; arena.len()];
    for (n, scc) in tarjan_scc(&graph.graph).into_iter().enumerate() {
        if scc.len() > 1 {
            for node in scc {
                component[graph.graph[node]] = n;
            }
        }
    }

    let mut demoted = 0;
    for idx in inlined {
        let edge = arena.edge(idx);
        let (source, target) = (component[edge.source], component[edge.target]);
        if source != usize::MAX && source == target {
            warn!(
                "Demoting {}.{} to link: inlining would cycle",
                arena.record(edge.source).id,
                edge.field
            );
            arena.edge_mut(idx).class = EdgeClass::Link;
            demoted += 1;
        }
    }
    demoted
}

fn relation_kinds(arena: &RecordArena, live: &[EdgeIdx]) -> BTreeMap<RelationGroup, RelationKind> {
    #[derive(Default)]
    struct GroupTally {
        cardinality: Option<Cardinality>,
        // target -> (edge count, distinct sources)
        targets: HashMap<RecordIdx, (usize, BTreeSet<RecordIdx>)>,
    }

    let mut tallies: BTreeMap<RelationGroup, GroupTally> = BTreeMap::new();
    for &idx in live {
        let edge = arena.edge(idx);
        let tally = tallies.entry(arena.group_of(edge)).or_default();
        tally.cardinality.get_or_insert(edge.cardinality);
        let entry = tally.targets.entry(edge.target).or_default();
        entry.0 += 1;
        entry.1.insert(edge.source);
    }

    tallies
        .into_iter()
        .map(|(group, tally)| {
            let kind = match tally.cardinality {
                Some(Cardinality::Many) => {
                    if tally.targets.values().any(|(_, sources)| sources.len() > 1) {
                        RelationKind::ManyToMany
                    } else {
                        RelationKind::OneToMany
                    }
                }
                _ => {
                    if tally.targets.values().any(|(count, _)| *count > 1) {
                        RelationKind::ManyToOne
                    } else {
                        RelationKind::OneToOne
                    }
                }
            };
            (group, kind)
        })
        .collect()
}
