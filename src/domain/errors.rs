use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Entity {entity_type} does not serialize to a flat field map: {reason}")]
    NotSnapshottable { entity_type: String, reason: String },

    #[error("Kind already registered: {0}")]
    DuplicateKind(String),
}
