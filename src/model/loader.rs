//! Model loading functionality
//!
//! Loads an object graph from JSON or YAML text. The document lists the
//! objects and, optionally, the root identities:
//!
//! ```json
//! {"roots": ["t1"], "objects": [
//!   {"id": "t1", "type": "Team", "fields": {
//!     "name": "Lions",
//!     "founded": {"$date": "1990-05-01"},
//!     "players": {"$refs": ["p1", "p2"]}}}]}
//! ```
//!
//! Plain JSON values are scalars and plain arrays are ordered scalar lists.
//! Everything else is written with a `$` marker object: `$ref` (with an
//! optional `type` hint), `$refs`, `$refset`, `$set`, `$map`, `$date`,
//! `$datetime`, `$uuid` and `$complex`.

use crate::convert::ConversionError;
use crate::models::{FieldValue, ObjectId, ObjectInstance, ObjectModel, ObjectRef, Scalar};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors raised while loading a model document
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {object}.{field}: {reason}")]
    InvalidValue {
        object: String,
        field: String,
        reason: String,
    },

    #[error("Duplicate object id: {0}")]
    DuplicateId(String),
}

impl From<LoadError> for ConversionError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io(e) => ConversionError::Io(e.to_string()),
            other => ConversionError::MalformedInput(other.to_string()),
        }
    }
}

/// A parsed model together with its roots
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub model: ObjectModel,
    /// Declared roots, or every object in document order when none are declared
    pub roots: Vec<ObjectId>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    #[serde(default)]
    roots: Option<Vec<String>>,
    #[serde(default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    supertypes: Vec<String>,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Loads object models from text or files
pub struct ModelLoader;

impl ModelLoader {
    pub fn from_json_str(text: &str) -> Result<LoadedModel, LoadError> {
        let raw: RawModel = serde_json::from_str(text)?;
        Self::build(raw)
    }

    pub fn from_yaml_str(text: &str) -> Result<LoadedModel, LoadError> {
        let raw: RawModel = serde_yaml::from_str(text)?;
        Self::build(raw)
    }

    /// Load from a file; `.yaml` and `.yml` files are read as YAML,
    /// everything else as JSON
    pub fn from_path(path: impl AsRef<Path>) -> Result<LoadedModel, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        debug!("Loading model from {}", path.display());
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    fn build(raw: RawModel) -> Result<LoadedModel, LoadError> {
        let mut model = ObjectModel::new();
        let mut order = Vec::with_capacity(raw.objects.len());
        let mut seen = HashSet::new();

        for object in raw.objects {
            if !seen.insert(object.id.clone()) {
                return Err(LoadError::DuplicateId(object.id));
            }
            let mut instance =
                ObjectInstance::new(object.id.as_str(), object.type_name).with_supertypes(object.supertypes);
            for (name, value) in &object.fields {
                let field = parse_field(value).map_err(|reason| LoadError::InvalidValue {
                    object: object.id.clone(),
                    field: name.clone(),
                    reason,
                })?;
                instance.set_field(name.clone(), field);
            }
            order.push(instance.id.clone());
            model.insert(instance);
        }

        let roots = match raw.roots {
            Some(roots) => roots.into_iter().map(ObjectId::from).collect(),
            None => order,
        };
        info!("Loaded {} objects with {} roots", model.len(), roots.len());
        Ok(LoadedModel { model, roots })
    }
}

fn parse_field(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Array(items) => Ok(FieldValue::Scalars {
            ordered: true,
            items: items.iter().map(parse_scalar).collect::<Result<_, _>>()?,
        }),
        Value::Object(object) => parse_marker(object),
        scalar => parse_scalar(scalar).map(FieldValue::Scalar),
    }
}

fn parse_marker(object: &Map<String, Value>) -> Result<FieldValue, String> {
    if let Some(target) = object.get("$ref") {
        return parse_ref(target, object.get("type")).map(FieldValue::Reference);
    }
    if let Some(targets) = object.get("$refs") {
        return parse_refs(targets, true);
    }
    if let Some(targets) = object.get("$refset") {
        return parse_refs(targets, false);
    }
    if let Some(items) = object.get("$set") {
        let items = items
            .as_array()
            .ok_or_else(|| "$set expects an array".to_string())?;
        return Ok(FieldValue::Scalars {
            ordered: false,
            items: items.iter().map(parse_scalar).collect::<Result<_, _>>()?,
        });
    }
    if let Some(entries) = object.get("$map") {
        let entries = entries
            .as_object()
            .ok_or_else(|| "$map expects an object".to_string())?;
        let map = entries
            .iter()
            .map(|(k, v)| parse_scalar(v).map(|s| (k.clone(), s)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        return Ok(FieldValue::Map(map));
    }
    parse_typed_scalar(object).map(FieldValue::Scalar)
}

fn parse_ref(target: &Value, type_hint: Option<&Value>) -> Result<ObjectRef, String> {
    let id = target
        .as_str()
        .ok_or_else(|| "$ref expects a string identity".to_string())?;
    let mut reference = ObjectRef::new(id);
    match type_hint {
        None => {}
        Some(Value::String(type_name)) => reference = reference.with_type_hint(type_name.as_str()),
        Some(_) => return Err("reference type hint must be a string".to_string()),
    }
    Ok(reference)
}

fn parse_refs(targets: &Value, ordered: bool) -> Result<FieldValue, String> {
    let targets = targets
        .as_array()
        .ok_or_else(|| "reference collection expects an array".to_string())?;
    let items = targets
        .iter()
        .map(|target| match target {
            Value::Object(object) => match object.get("$ref") {
                Some(id) => parse_ref(id, object.get("type")),
                None => Err("reference collection items must be strings or $ref objects".to_string()),
            },
            other => parse_ref(other, None),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FieldValue::References { ordered, items })
}

fn parse_scalar(value: &Value) -> Result<Scalar, String> {
    match value {
        Value::Null => Ok(Scalar::Null),
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Scalar::Int(i)),
            None => n
                .as_f64()
                .map(Scalar::Float)
                .ok_or_else(|| format!("unsupported number {}", n)),
        },
        Value::String(s) => Ok(Scalar::Text(s.clone())),
        Value::Array(_) => Err("nested collections are not supported".to_string()),
        Value::Object(object) => parse_typed_scalar(object),
    }
}

fn parse_typed_scalar(object: &Map<String, Value>) -> Result<Scalar, String> {
    let text = |key: &str, value: &Value| {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("{} expects a string", key))
    };

    if let Some(value) = object.get("$date") {
        let s = text("$date", value)?;
        return NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Scalar::Date)
            .map_err(|e| format!("invalid date '{}': {}", s, e));
    }
    if let Some(value) = object.get("$datetime") {
        let s = text("$datetime", value)?;
        return DateTime::parse_from_rfc3339(&s)
            .map(|dt| Scalar::DateTime(dt.with_timezone(&Utc)))
            .map_err(|e| format!("invalid datetime '{}': {}", s, e));
    }
    if let Some(value) = object.get("$uuid") {
        let s = text("$uuid", value)?;
        return Uuid::parse_str(&s)
            .map(Scalar::Uuid)
            .map_err(|e| format!("invalid uuid '{}': {}", s, e));
    }
    if let Some(value) = object.get("$complex") {
        let parts = value
            .as_array()
            .filter(|parts| parts.len() == 2)
            .ok_or_else(|| "$complex expects [real, imag]".to_string())?;
        let real = parts[0].as_f64().ok_or("$complex parts must be numbers")?;
        let imag = parts[1].as_f64().ok_or("$complex parts must be numbers")?;
        return Ok(Scalar::Complex { real, imag });
    }

    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    Err(format!(
        "objects must use a $ marker (found keys: {})",
        keys.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        let loaded = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "t1", "type": "Team", "fields": {
                "name": "Lions",
                "founded": {"$date": "1990-05-01"},
                "players": {"$refs": ["p1", {"$ref": "p2", "type": "Player"}]},
                "captain": {"$ref": "p1"},
                "tags": {"$set": ["a", "b"]},
                "scores": [1, 2.5],
                "meta": {"$map": {"k": 1}},
                "z": {"$complex": [1, -2]}
            }}]}"#,
        )
        .unwrap();

        assert_eq!(loaded.roots, vec![ObjectId::from("t1")]);
        let team = loaded.model.get(&ObjectId::from("t1")).unwrap();
        assert_eq!(
            team.field("founded"),
            Some(&FieldValue::Scalar(Scalar::Date(
                NaiveDate::from_ymd_opt(1990, 5, 1).unwrap()
            )))
        );
        assert!(matches!(
            team.field("players"),
            Some(FieldValue::References { ordered: true, items })
                if items[1].type_hint.as_deref() == Some("Player")
        ));
        assert!(matches!(
            team.field("tags"),
            Some(FieldValue::Scalars { ordered: false, .. })
        ));
        assert_eq!(
            team.field("z"),
            Some(&FieldValue::Scalar(Scalar::Complex { real: 1.0, imag: -2.0 }))
        );
    }

    #[test]
    fn test_plain_object_rejected() {
        let err = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "a", "type": "A", "fields": {"x": {"k": 1}}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { ref field, .. } if field == "x"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = ModelLoader::from_json_str(
            r#"{"objects": [{"id": "a", "type": "A"}, {"id": "a", "type": "B"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn test_yaml() {
        let loaded = ModelLoader::from_yaml_str(
            "roots: [b]\nobjects:\n  - id: a\n    type: A\n  - id: b\n    type: B\n    fields:\n      a:\n        $ref: a\n",
        )
        .unwrap();
        assert_eq!(loaded.roots, vec![ObjectId::from("b")]);
        assert_eq!(loaded.model.len(), 2);
    }
}
