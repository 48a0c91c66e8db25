//! Output writer tests

use object_model_converter::export::OutputEncoding;
use object_model_converter::{
    ConversionReport, ModelLoader, ObjectId, ObjectInstance, ObjectModel, OutputWriter,
    TargetFormat, convert,
};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn library_report(formats: &[TargetFormat]) -> ConversionReport {
    let loaded = ModelLoader::from_path(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/library.json"
    ))
    .unwrap();
    convert(&loaded.model, &loaded.roots, formats).unwrap()
}

mod json_writer_tests {
    use super::*;

    #[test]
    fn test_write_all_formats() {
        let dir = TempDir::new().unwrap();
        let report = library_report(&TargetFormat::ALL);

        let written = OutputWriter::new(dir.path()).write_report(&report).unwrap();
        // 2 collections, nodes + edges, 6 tables, 1 junction table, report
        assert_eq!(written.len(), 12);

        let people = fs::read_to_string(dir.path().join("documents/Person.jsonl")).unwrap();
        assert_eq!(people.lines().count(), 3);
        let first: Value = serde_json::from_str(people.lines().next().unwrap()).unwrap();
        assert_eq!(first["_id"], "m1");

        let nodes: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("graph/nodes.json")).unwrap())
                .unwrap();
        assert_eq!(nodes.len(), 8);
        assert!(dir.path().join("graph/edges.json").exists());

        let book: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("columnar/Book.json")).unwrap())
                .unwrap();
        assert_eq!(book["columns"][0]["name"], "id");
        assert_eq!(book["columns"][1]["type"], "list<text>");
        assert!(dir.path().join("columnar/junction/person_borrowed.json").exists());
    }

    #[test]
    fn test_colliding_collections_get_distinct_files() {
        let model: ObjectModel = [
            ObjectInstance::new("a", "Team Member").with_field("name", "Ann"),
            ObjectInstance::new("b", "Team_Member").with_field("name", "Bob"),
        ]
        .into_iter()
        .collect();
        let roots = vec![ObjectId::from("a"), ObjectId::from("b")];
        let report = convert(&model, &roots, &[TargetFormat::Document]).unwrap();

        let dir = TempDir::new().unwrap();
        OutputWriter::new(dir.path()).write_report(&report).unwrap();

        let first: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("documents/Team_Member.jsonl")).unwrap(),
        )
        .unwrap();
        let second: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("documents/Team_Member_2.jsonl")).unwrap(),
        )
        .unwrap();
        assert_eq!(first["name"], "Ann");
        assert_eq!(second["name"], "Bob");
    }

    #[test]
    fn test_report_summary() {
        let dir = TempDir::new().unwrap();
        let report = library_report(&[TargetFormat::Graph]);
        OutputWriter::new(dir.path()).write_report(&report).unwrap();

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(summary["digest"], report.digest.as_str());
        assert_eq!(summary["stats"]["records"], 8);
        assert_eq!(summary["failures"].as_array().unwrap().len(), 0);
        assert!(!dir.path().join("documents").exists());
    }
}

mod yaml_writer_tests {
    use super::*;

    #[test]
    fn test_yaml_documents() {
        let dir = TempDir::new().unwrap();
        let report = library_report(&[TargetFormat::Document]);

        let written = OutputWriter::new(dir.path())
            .with_encoding(OutputEncoding::Yaml)
            .write_report(&report)
            .unwrap();
        assert!(written.iter().any(|f| f.path.ends_with("documents/Person.yaml") && f.entries == 3));

        let people: Vec<Value> =
            serde_yaml::from_str(&fs::read_to_string(dir.path().join("documents/Person.yaml")).unwrap())
                .unwrap();
        assert_eq!(people.len(), 3);
        assert_eq!(people[2]["name"], "Magdalena QWE");
        assert!(dir.path().join("report.yaml").exists());
    }
}
