//! Field values carried by object instances

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque object identity, unique within a conversion run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single scalar value.
///
/// Serializes to its document form: dates become ISO 8601 strings, UUIDs
/// become hyphenated strings and complex numbers become
/// `{"real", "imag", "_type": "complex"}` objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Complex { real: f64, imag: f64 },
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Name of the scalar kind, used in schema conflict messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
            Scalar::Date(_) => "date",
            Scalar::DateTime(_) => "datetime",
            Scalar::Uuid(_) => "uuid",
            Scalar::Complex { .. } => "complex",
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => float_to_json(*f),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Scalar::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Scalar::Uuid(u) => Value::String(u.to_string()),
            Scalar::Complex { real, imag } => serde_json::json!({
                "real": float_to_json(*real),
                "imag": float_to_json(*imag),
                "_type": "complex",
            }),
        }
    }
}

// JSON has no NaN or infinity; those are written as strings
fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(f.to_string()))
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(dt: DateTime<Utc>) -> Self {
        Scalar::DateTime(dt)
    }
}

impl From<Uuid> for Scalar {
    fn from(u: Uuid) -> Self {
        Scalar::Uuid(u)
    }
}

/// Pointer from a field to another object instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    /// Type used for the stub record when the target is missing and
    /// partial graphs are tolerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

impl ObjectRef {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            type_hint: None,
        }
    }

    pub fn with_type_hint(mut self, type_name: impl Into<String>) -> Self {
        self.type_hint = Some(type_name.into());
        self
    }
}

/// Value of one field of an object instance
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Reference(ObjectRef),
    /// Collection of scalars; `ordered` is false for set-like collections
    Scalars { ordered: bool, items: Vec<Scalar> },
    /// Collection of references; `ordered` is false for set-like collections
    References { ordered: bool, items: Vec<ObjectRef> },
    /// String-keyed map of scalars, treated as one structured value
    Map(BTreeMap<String, Scalar>),
}

impl FieldValue {
    pub fn reference(id: impl Into<ObjectId>) -> Self {
        FieldValue::Reference(ObjectRef::new(id))
    }

    pub fn references<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ObjectId>,
    {
        FieldValue::References {
            ordered: true,
            items: ids.into_iter().map(ObjectRef::new).collect(),
        }
    }

    pub fn reference_set<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ObjectId>,
    {
        FieldValue::References {
            ordered: false,
            items: ids.into_iter().map(ObjectRef::new).collect(),
        }
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        FieldValue::Scalars {
            ordered: true,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn null() -> Self {
        FieldValue::Scalar(Scalar::Null)
    }

    /// Structural shape of this value
    pub fn shape(&self) -> FieldShape {
        match self {
            FieldValue::Scalar(Scalar::Null) => FieldShape::Null,
            FieldValue::Scalar(_) => FieldShape::Scalar,
            FieldValue::Reference(_) => FieldShape::Reference,
            FieldValue::Scalars { items, .. } if items.is_empty() => FieldShape::EmptyCollection,
            FieldValue::Scalars { .. } => FieldShape::Scalars,
            FieldValue::References { .. } => FieldShape::References,
            FieldValue::Map(_) => FieldShape::Map,
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        FieldValue::Scalar(value)
    }
}

macro_rules! scalar_field_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_field_from!(bool, i64, i32, f64, &str, String, NaiveDate, DateTime<Utc>, Uuid);

/// Declared shape of a field, fixed per (type, field) within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldShape {
    /// Explicit null; fits any shape
    Null,
    /// Empty scalar list; fits either collection shape
    EmptyCollection,
    Scalar,
    Reference,
    Scalars,
    References,
    Map,
}

impl FieldShape {
    /// Whether this observation is specific enough to fix a field's shape
    pub fn is_definite(&self) -> bool {
        !matches!(self, FieldShape::Null | FieldShape::EmptyCollection)
    }

    /// Whether a value of this shape may appear in a field whose shape is `declared`
    pub fn fits(&self, declared: FieldShape) -> bool {
        match self {
            FieldShape::Null => true,
            FieldShape::EmptyCollection => matches!(
                declared,
                FieldShape::Scalars | FieldShape::References | FieldShape::EmptyCollection
            ),
            shape => *shape == declared,
        }
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldShape::Null => "null",
            FieldShape::EmptyCollection => "empty collection",
            FieldShape::Scalar => "scalar",
            FieldShape::Reference => "single reference",
            FieldShape::Scalars => "scalar collection",
            FieldShape::References => "reference collection",
            FieldShape::Map => "map",
        };
        f.write_str(name)
    }
}
