//! Flat field snapshots and update change sets
//!
//! Audit records store entity state as a flat map from field name to a JSON
//! scalar or array. Nested objects are not diffed; they are stored as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat field-name → value map describing an entity at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a serialized entity, keeping only the named fields.
    ///
    /// Fields missing from the source are recorded as `null` so every snapshot
    /// of a kind has the same shape.
    pub fn project(source: &serde_json::Map<String, Value>, fields: &[&str]) -> Self {
        let inner = fields
            .iter()
            .map(|field| {
                (
                    (*field).to_string(),
                    source.get(*field).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        Self(inner)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of a field, if it holds one
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }

    /// Parse a stored JSON column back into a snapshot. Non-object values are
    /// wrapped under a single `value` key rather than dropped.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map.into_iter().collect()),
            Value::Null => Self::default(),
            other => {
                let mut snapshot = Self::default();
                snapshot.insert("value", other);
                snapshot
            }
        }
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Old/new pair for one changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Field-level change set computed by the persistence layer before an update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change; unchanged values are ignored
    pub fn record(&mut self, field: impl Into<String>, old: Value, new: Value) {
        if old != new {
            self.0.insert(field.into(), FieldChange { old, new });
        }
    }

    /// Builder-style variant of [`ChangeSet::record`]
    pub fn with(mut self, field: impl Into<String>, old: Value, new: Value) -> Self {
        self.record(field, old, new);
        self
    }

    /// Diff two serialized states of the same entity
    pub fn between(
        before: &serde_json::Map<String, Value>,
        after: &serde_json::Map<String, Value>,
    ) -> Self {
        let mut changes = Self::new();
        for (field, old) in before {
            let new = after.get(field).cloned().unwrap_or(Value::Null);
            changes.record(field.clone(), old.clone(), new);
        }
        for (field, new) in after {
            if !before.contains_key(field) {
                changes.record(field.clone(), Value::Null, new.clone());
            }
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    /// Prior values of the changed fields only
    pub fn old_values(&self) -> Snapshot {
        self.0
            .iter()
            .map(|(field, change)| (field.clone(), change.old.clone()))
            .collect()
    }
}
