//! Model loading tests

use object_model_converter::export::columnar::{Cell, ColumnType};
use object_model_converter::{
    FieldValue, LoadError, ModelLoader, ObjectId, Scalar, TargetFormat, convert,
};
use serde_json::json;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

mod yaml_loader_tests {
    use super::*;

    #[test]
    fn test_load_team_yaml() {
        let loaded = ModelLoader::from_path(fixture("team.yaml")).unwrap();
        assert_eq!(loaded.model.len(), 3);
        assert_eq!(loaded.roots, vec![ObjectId::from("t1")]);

        let p1 = loaded.model.get(&ObjectId::from("p1")).unwrap();
        assert_eq!(
            p1.field("signal"),
            Some(&FieldValue::Scalar(Scalar::Complex {
                real: 1.5,
                imag: -2.0
            }))
        );
        assert_eq!(p1.field("number"), Some(&FieldValue::Scalar(Scalar::Int(7))));

        let t1 = loaded.model.get(&ObjectId::from("t1")).unwrap();
        assert!(matches!(
            t1.field("captain"),
            Some(FieldValue::Reference(target)) if target.type_hint.as_deref() == Some("Player")
        ));
        assert!(matches!(
            t1.field("colours"),
            Some(FieldValue::Scalars { ordered: false, items }) if items.len() == 2
        ));
    }

    #[test]
    fn test_convert_team_yaml() {
        let loaded = ModelLoader::from_path(fixture("team.yaml")).unwrap();
        let report = convert(&loaded.model, &loaded.roots, &TargetFormat::ALL).unwrap();
        assert!(report.is_complete_success());

        // players are reachable through two fields, so they stay links
        let team = &report.documents().unwrap().collection("Team")[0];
        assert_eq!(team["captain"], json!("p1"));
        assert_eq!(team["players"], json!(["p1", "p2"]));
        assert_eq!(team["founded"], json!("1990-05-01"));

        let graph = report.graph().unwrap();
        let p1 = graph
            .nodes
            .iter()
            .find(|n| n.id == ObjectId::from("p1"))
            .unwrap();
        assert_eq!(
            p1.properties["signal"],
            json!({"real": 1.5, "imag": -2.0, "_type": "complex"})
        );

        let dataset = report.columnar().unwrap();
        let players = dataset.table("Player").unwrap();
        assert_eq!(players.column("signal").unwrap().data_type, ColumnType::Text);
        let signal = players.column_index("signal").unwrap();
        assert_eq!(
            players.rows[0][signal],
            Cell::Scalar(Scalar::Text("1.5-2i".to_string()))
        );
        assert_eq!(
            players.column("stats").unwrap().data_type,
            ColumnType::Map(Box::new(ColumnType::BigInt))
        );
        assert_eq!(
            dataset.table("Team").unwrap().column("colours").unwrap().data_type,
            ColumnType::List(Box::new(ColumnType::Text))
        );
        assert!(dataset.table("Team").unwrap().column("captain_id").is_some());
    }
}

mod json_loader_tests {
    use super::*;

    #[test]
    fn test_load_library_json() {
        let loaded = ModelLoader::from_path(fixture("library.json")).unwrap();
        assert_eq!(loaded.model.len(), 8);
        assert_eq!(loaded.roots.len(), 4);

        let e1 = loaded.model.get(&ObjectId::from("e1")).unwrap();
        assert_eq!(e1.supertypes, vec!["Person".to_string()]);
        assert_eq!(e1.field("salary"), Some(&FieldValue::Scalar(Scalar::Float(5000.0))));
    }

    #[test]
    fn test_roots_default_to_document_order() {
        let loaded = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "z", "type": "A"}, {"id": "a", "type": "A"}]}"#,
        )
        .unwrap();
        assert_eq!(loaded.roots, vec![ObjectId::from("z"), ObjectId::from("a")]);
    }

    #[test]
    fn test_invalid_markers_are_rejected() {
        let bad_date = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "a", "type": "A", "fields": {"d": {"$date": "yesterday"}}}]}"#,
        );
        assert!(matches!(bad_date, Err(LoadError::InvalidValue { .. })));

        let nested = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "a", "type": "A", "fields": {"x": [[1]]}}]}"#,
        );
        assert!(matches!(nested, Err(LoadError::InvalidValue { .. })));

        let bad_refs = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "a", "type": "A", "fields": {"x": {"$refs": [1]}}}]}"#,
        );
        assert!(matches!(bad_refs, Err(LoadError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = ModelLoader::from_path(fixture("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
