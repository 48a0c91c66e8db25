//! Configuration for conversion runs

use serde::{Deserialize, Serialize};

/// What the reader does when a reference target is absent from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnresolvedPolicy {
    /// Fail the referencing entity
    #[default]
    Fail,
    /// Emit a stub record carrying only identity and type
    Stub,
}

/// How null scalar fields appear in documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NullPolicy {
    #[default]
    Omit,
    Emit,
}

/// How graph edge labels are derived from field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeLabelStyle {
    /// The field name as-is (`players`)
    #[default]
    FieldName,
    /// Upper-cased relationship style (`HAS_PLAYERS`)
    Relationship,
}

/// Traversal bounds and missing-target handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraversalOptions {
    /// Deepest level a record may be entered at (roots are depth 0)
    pub max_depth: usize,
    /// Maximum number of records created in one run
    pub max_records: usize,
    pub unresolved: UnresolvedPolicy,
    /// Type given to stub records whose reference carries no type hint
    pub stub_type: String,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_records: 100_000,
            unresolved: UnresolvedPolicy::Fail,
            stub_type: "External".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverOptions {
    /// Classify exclusive one-to-one references as denormalize instead of embed
    pub denormalize_one_to_one: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentOptions {
    pub null_policy: NullPolicy,
    /// Write a `_type` field on every document and embedded object
    pub type_tag: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            null_policy: NullPolicy::Omit,
            type_tag: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    pub edge_label_style: EdgeLabelStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnarOptions {
    /// Lower-case table and column names
    pub lowercase_identifiers: bool,
}

/// Options for one conversion run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub traversal: TraversalOptions,
    pub resolver: ResolverOptions,
    pub document: DocumentOptions,
    pub graph: GraphOptions,
    pub columnar: ColumnarOptions,
}

impl ConversionOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom options
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder::default()
    }
}

/// Builder for ConversionOptions
#[derive(Debug, Default)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    /// Set the maximum traversal depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.traversal.max_depth = depth;
        self
    }

    /// Set the maximum number of records per run (at least 1)
    pub fn max_records(mut self, max: usize) -> Self {
        self.options.traversal.max_records = max.max(1);
        self
    }

    /// Set the unresolved reference policy
    pub fn unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.options.traversal.unresolved = policy;
        self
    }

    /// Set the type name used for stubs without a type hint
    pub fn stub_type(mut self, type_name: impl Into<String>) -> Self {
        self.options.traversal.stub_type = type_name.into();
        self
    }

    /// Enable or disable denormalization of one-to-one references
    pub fn denormalize_one_to_one(mut self, enabled: bool) -> Self {
        self.options.resolver.denormalize_one_to_one = enabled;
        self
    }

    /// Set the document null policy
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.options.document.null_policy = policy;
        self
    }

    /// Enable or disable `_type` tags in documents
    pub fn type_tag(mut self, enabled: bool) -> Self {
        self.options.document.type_tag = enabled;
        self
    }

    /// Set the graph edge label style
    pub fn edge_label_style(mut self, style: EdgeLabelStyle) -> Self {
        self.options.graph.edge_label_style = style;
        self
    }

    /// Enable or disable lower-cased columnar identifiers
    pub fn lowercase_identifiers(mut self, enabled: bool) -> Self {
        self.options.columnar.lowercase_identifiers = enabled;
        self
    }

    /// Build the options
    pub fn build(self) -> ConversionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConversionOptions::default();
        assert_eq!(options.traversal.max_depth, 64);
        assert_eq!(options.traversal.max_records, 100_000);
        assert_eq!(options.traversal.unresolved, UnresolvedPolicy::Fail);
        assert_eq!(options.document.null_policy, NullPolicy::Omit);
        assert!(options.document.type_tag);
        assert!(!options.resolver.denormalize_one_to_one);
    }

    #[test]
    fn test_builder() {
        let options = ConversionOptions::builder()
            .max_depth(3)
            .max_records(0)
            .unresolved(UnresolvedPolicy::Stub)
            .edge_label_style(EdgeLabelStyle::Relationship)
            .lowercase_identifiers(true)
            .build();

        assert_eq!(options.traversal.max_depth, 3);
        assert_eq!(options.traversal.max_records, 1);
        assert_eq!(options.traversal.unresolved, UnresolvedPolicy::Stub);
        assert_eq!(options.graph.edge_label_style, EdgeLabelStyle::Relationship);
        assert!(options.columnar.lowercase_identifiers);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: ConversionOptions =
            serde_json::from_str(r#"{"traversal": {"unresolved": "stub"}}"#).unwrap();
        assert_eq!(options.traversal.unresolved, UnresolvedPolicy::Stub);
        assert_eq!(options.traversal.max_depth, 64);
        assert_eq!(options.document, DocumentOptions::default());
    }
}
