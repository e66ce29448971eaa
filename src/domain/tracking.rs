//! Tracked entity kinds
//!
//! Lifecycle notifications carry an [`EntityRef`]; the [`KindRegistry`]
//! decides whether the kind is audited and how its label, snapshot and
//! descriptions are derived. Adding a kind means registering one
//! [`KindDescriptor`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::errors::DomainError;
use crate::domain::value_objects::{AuditAction, Snapshot};

static PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

static DEFAULT_KINDS: Lazy<KindRegistry> = Lazy::new(|| {
    let mut registry = KindRegistry::empty();
    for descriptor in [
        KindDescriptor::destination(),
        KindDescriptor::hotel(),
        KindDescriptor::user(),
    ] {
        registry.kinds.insert(descriptor.entity_type.to_string(), descriptor);
    }
    registry
});

/// Persisted business entity whose lifecycle may be audited
pub trait Trackable: Serialize {
    /// Entity type name written to `entityType`
    const ENTITY_TYPE: &'static str;

    /// Storage id; `None` before the first insert
    fn entity_id(&self) -> Option<i64>;
}

/// Entity as seen by a lifecycle notification
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    entity_type: String,
    entity_id: Option<i64>,
    fields: Map<String, Value>,
}

impl EntityRef {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: Option<i64>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            fields,
        }
    }

    /// Serialize a trackable entity into its flat field map
    pub fn of<T: Trackable>(entity: &T) -> Result<Self, DomainError> {
        let not_snapshottable = |reason: String| DomainError::NotSnapshottable {
            entity_type: T::ENTITY_TYPE.to_string(),
            reason,
        };
        match serde_json::to_value(entity) {
            Ok(Value::Object(fields)) => Ok(Self::new(T::ENTITY_TYPE, entity.entity_id(), fields)),
            Ok(other) => Err(not_snapshottable(format!("expected object, got {}", other))),
            Err(e) => Err(not_snapshottable(e.to_string())),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> Option<i64> {
        self.entity_id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Lifecycle transition being described
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Update,
    Delete,
}

impl Transition {
    pub fn action(self) -> AuditAction {
        match self {
            Transition::Create => AuditAction::Create,
            Transition::Update => AuditAction::Update,
            Transition::Delete => AuditAction::Delete,
        }
    }
}

/// Description templates per transition.
///
/// `{name}` expands to the entity label, any other `{field}` to that field's
/// value. Missing or null fields expand to an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionTemplates {
    pub create: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

/// How one entity kind is audited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDescriptor {
    pub entity_type: &'static str,
    /// Fields joined with a space to form the entity label
    pub label_fields: &'static [&'static str],
    pub snapshot_fields: &'static [&'static str],
    pub templates: DescriptionTemplates,
}

impl KindDescriptor {
    pub fn destination() -> Self {
        Self {
            entity_type: "Destination",
            label_fields: &["name"],
            snapshot_fields: &["id", "name", "location", "description", "image", "createdBy"],
            templates: DescriptionTemplates {
                create: "Created destination: {name} in {location}",
                update: "Updated destination: {name}",
                delete: "Deleted destination: {name}",
            },
        }
    }

    pub fn hotel() -> Self {
        Self {
            entity_type: "Hotel",
            label_fields: &["name"],
            snapshot_fields: &["id", "name", "location", "price", "description", "image"],
            templates: DescriptionTemplates {
                create: "Created hotel: {name} in {location}",
                update: "Updated hotel: {name}",
                delete: "Deleted hotel: {name}",
            },
        }
    }

    pub fn user() -> Self {
        Self {
            entity_type: "User",
            label_fields: &["firstName", "lastName"],
            snapshot_fields: &["id", "firstName", "lastName", "email", "roles"],
            templates: DescriptionTemplates {
                create: "Created user: {name} ({email})",
                update: "Updated user: {name}",
                delete: "Deleted user: {name}",
            },
        }
    }

    /// Human-readable name written to `entityName`
    pub fn label(&self, entity: &EntityRef) -> Option<String> {
        let parts: Vec<String> = self
            .label_fields
            .iter()
            .filter_map(|field| entity.fields().get(*field).and_then(display_value))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn snapshot(&self, entity: &EntityRef) -> Snapshot {
        Snapshot::project(entity.fields(), self.snapshot_fields)
    }

    pub fn describe(&self, transition: Transition, entity: &EntityRef) -> String {
        let template = match transition {
            Transition::Create => self.templates.create,
            Transition::Update => self.templates.update,
            Transition::Delete => self.templates.delete,
        };
        let Some(pattern) = PLACEHOLDER.as_ref() else {
            return template.to_string();
        };
        let label = self.label(entity).unwrap_or_default();
        pattern
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "name" => label.clone(),
                field => entity
                    .fields()
                    .get(field)
                    .and_then(display_value)
                    .unwrap_or_default(),
            })
            .into_owned()
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Entity type name → descriptor
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, KindDescriptor>,
}

impl KindRegistry {
    /// Registry with no tracked kinds
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn register(&mut self, descriptor: KindDescriptor) -> Result<(), DomainError> {
        if self.kinds.contains_key(descriptor.entity_type) {
            return Err(DomainError::DuplicateKind(descriptor.entity_type.to_string()));
        }
        self.kinds.insert(descriptor.entity_type.to_string(), descriptor);
        Ok(())
    }

    pub fn get(&self, entity_type: &str) -> Option<&KindDescriptor> {
        self.kinds.get(entity_type)
    }

    pub fn is_tracked(&self, entity_type: &str) -> bool {
        self.kinds.contains_key(entity_type)
    }

    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Destination, Hotel and User
impl Default for KindRegistry {
    fn default() -> Self {
        DEFAULT_KINDS.clone()
    }
}
