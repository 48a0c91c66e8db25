//! Property-based tests over randomly generated object graphs

use object_model_converter::models::Payload;
use object_model_converter::{
    ConversionReport, FieldValue, ObjectId, ObjectInstance, ObjectModel, TargetFormat, convert,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

/// One generated object: type index, scalar `v`, optional single reference
/// `r` and reference list `rs` (indices into the object list)
type Generated = (usize, i64, Option<usize>, Vec<usize>);

fn graph_strategy() -> impl Strategy<Value = Vec<Generated>> {
    prop::collection::vec(
        (
            0..3usize,
            any::<i64>(),
            prop::option::of(0..8usize),
            prop::collection::vec(0..8usize, 0..3),
        ),
        1..8,
    )
}

fn build(objects: &[Generated]) -> (ObjectModel, Vec<ObjectId>) {
    let n = objects.len();
    let id = |i: usize| format!("o{}", i % n);

    let model: ObjectModel = objects
        .iter()
        .enumerate()
        .map(|(i, (ty, v, r, rs))| {
            let r = match r {
                Some(target) => FieldValue::reference(id(*target)),
                None => FieldValue::null(),
            };
            ObjectInstance::new(id(i), format!("T{}", ty))
                .with_field("v", *v)
                .with_field("r", r)
                .with_field("rs", FieldValue::references(rs.iter().map(|t| id(*t))))
        })
        .collect();
    let roots = (0..n).map(|i| ObjectId::from(id(i))).collect();
    (model, roots)
}

fn run(objects: &[Generated]) -> ConversionReport {
    let (model, roots) = build(objects);
    convert(&model, &roots, &TargetFormat::ALL).unwrap()
}

mod property_tests {
    use super::*;

    proptest! {
        /// Every record becomes one node and every reference one edge
        #[test]
        fn prop_graph_matches_model(objects in graph_strategy()) {
            let report = run(&objects);
            prop_assert!(report.is_complete_success());

            let references: usize = objects
                .iter()
                .map(|(_, _, r, rs)| usize::from(r.is_some()) + rs.len())
                .sum();
            let graph = report.graph().unwrap();
            prop_assert_eq!(graph.nodes.len(), objects.len());
            prop_assert_eq!(graph.nodes.len(), report.stats.records);
            prop_assert_eq!(graph.edges.len(), references);
            prop_assert_eq!(graph.edges.len(), report.stats.edges);
        }

        /// One table per type, every row as wide as its table
        #[test]
        fn prop_tables_are_rectangular(objects in graph_strategy()) {
            let report = run(&objects);
            let dataset = report.columnar().unwrap();

            let types: BTreeSet<usize> = objects.iter().map(|(ty, ..)| *ty).collect();
            prop_assert_eq!(dataset.tables.len(), types.len());
            let rows: usize = dataset.tables.iter().map(|t| t.rows.len()).sum();
            prop_assert_eq!(rows, objects.len());
            for table in &dataset.tables {
                for row in &table.rows {
                    prop_assert_eq!(row.len(), table.width());
                }
            }
        }

        /// Each root document keeps its own scalar value
        #[test]
        fn prop_documents_keep_root_scalars(objects in graph_strategy()) {
            let report = run(&objects);
            let results: Vec<_> = report.results_for(TargetFormat::Document).collect();
            prop_assert_eq!(results.len(), objects.len());

            for (result, (_, v, _, _)) in results.iter().zip(&objects) {
                match result.payload() {
                    Some(Payload::Document(doc)) => {
                        prop_assert_eq!(&doc["_id"], &json!(result.identity.as_str()));
                        prop_assert_eq!(&doc["v"], &json!(v));
                    }
                    other => prop_assert!(false, "unexpected payload {:?}", other),
                }
            }
        }

        /// The same model always converts to the same bytes
        #[test]
        fn prop_conversion_is_deterministic(objects in graph_strategy()) {
            let first = run(&objects);
            let second = run(&objects);
            prop_assert_eq!(&first.digest, &second.digest);
            prop_assert_eq!(&first.outputs, &second.outputs);
        }
    }
}
