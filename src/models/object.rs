//! Source object instances and the arena holding them

use super::value::{FieldValue, ObjectId};
use std::collections::BTreeMap;

/// One source object: identity, type and fields
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    pub id: ObjectId,
    pub type_name: String,
    /// Ancestor type names, nearest first
    pub supertypes: Vec<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ObjectInstance {
    pub fn new(id: impl Into<ObjectId>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            supertypes: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_supertypes<I, S>(mut self, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes = supertypes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// In-memory object graph, keyed by identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectModel {
    objects: BTreeMap<ObjectId, ObjectInstance>,
}

impl ObjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instance, returning the instance previously stored under the same id
    pub fn insert(&mut self, instance: ObjectInstance) -> Option<ObjectInstance> {
        self.objects.insert(instance.id.clone(), instance)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&ObjectInstance> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.objects.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }
}

impl FromIterator<ObjectInstance> for ObjectModel {
    fn from_iter<I: IntoIterator<Item = ObjectInstance>>(iter: I) -> Self {
        let mut model = ObjectModel::new();
        for instance in iter {
            model.insert(instance);
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_id() {
        let mut model = ObjectModel::new();
        assert!(model.insert(ObjectInstance::new("a", "Team")).is_none());
        let previous = model.insert(ObjectInstance::new("a", "Player"));
        assert_eq!(previous.map(|p| p.type_name), Some("Team".to_string()));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_builder_fields() {
        let team = ObjectInstance::new("t1", "Team")
            .with_supertypes(["Organisation"])
            .with_field("name", "Lions")
            .with_field("players", FieldValue::references(["p1", "p2"]));

        assert_eq!(team.supertypes, vec!["Organisation".to_string()]);
        assert!(matches!(
            team.field("players"),
            Some(FieldValue::References { items, .. }) if items.len() == 2
        ));
    }
}
