//! Typed side-table of user properties attached to model entities

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entity a property is attached to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Node(usize),
    Element(usize),
    Constraint(usize),
    Pattern(usize),
    Material(String),
    Section(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    Vector(Vec<f64>),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Serialized form of one table entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub entity: EntityId,
    pub key: String,
    pub value: PropertyValue,
}

/// Properties keyed by (entity, name)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PropertyEntry>", into = "Vec<PropertyEntry>")]
pub struct PropertyTable {
    entries: BTreeMap<(EntityId, String), PropertyValue>,
}

impl From<Vec<PropertyEntry>> for PropertyTable {
    fn from(entries: Vec<PropertyEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| ((e.entity, e.key), e.value))
                .collect(),
        }
    }
}

impl From<PropertyTable> for Vec<PropertyEntry> {
    fn from(table: PropertyTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|((entity, key), value)| PropertyEntry { entity, key, value })
            .collect()
    }
}

impl PropertyTable {
    /// Set a property, returning the previous value
    pub fn set(
        &mut self,
        entity: EntityId,
        key: impl Into<String>,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.entries.insert((entity, key.into()), value)
    }

    pub fn get(&self, entity: &EntityId, key: &str) -> Option<&PropertyValue> {
        self.entries.get(&(entity.clone(), key.to_string()))
    }

    pub fn get_f64(&self, entity: &EntityId, key: &str) -> Option<f64> {
        self.get(entity, key).and_then(PropertyValue::as_f64)
    }

    pub fn remove(&mut self, entity: &EntityId, key: &str) -> Option<PropertyValue> {
        self.entries.remove(&(entity.clone(), key.to_string()))
    }

    /// All properties of one entity
    pub fn of<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = (&'a str, &'a PropertyValue)> {
        self.entries
            .iter()
            .filter(move |((e, _), _)| e == entity)
            .map(|((_, k), v)| (k.as_str(), v))
    }

    /// Drop every property of an entity
    pub fn remove_entity(&mut self, entity: &EntityId) {
        self.entries.retain(|(e, _), _| e != entity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_json() {
        let mut t = PropertyTable::default();
        let sec = EntityId::Section("IPE200".to_string());
        t.set(sec.clone(), "fyd", PropertyValue::Float(338e6));
        t.set(EntityId::Node(3), "label", PropertyValue::Text("tip".to_string()));
        assert_eq!(t.get_f64(&sec, "fyd"), Some(338e6));
        assert_eq!(t.of(&EntityId::Node(3)).count(), 1);

        let json = serde_json::to_string(&t).unwrap();
        let back: PropertyTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        t.remove_entity(&sec);
        assert_eq!(t.len(), 1);
    }
}
