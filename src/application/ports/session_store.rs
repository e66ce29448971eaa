use serde_json::Value;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session unavailable: {0}")]
    Unavailable(String),

    #[error("Session value malformed: {0}")]
    Serialization(String),
}

/// Port for one user session's key/value storage
#[cfg_attr(test, automock)]
pub trait SessionStore: Send + Sync {
    /// Session identifier (log-safe)
    fn id(&self) -> String;

    fn get(&self, key: &str) -> Result<Option<Value>, SessionError>;

    fn insert(&self, key: &str, value: Value) -> Result<(), SessionError>;

    fn remove(&self, key: &str) -> Result<(), SessionError>;

    /// All keys currently stored in the session
    fn keys(&self) -> Result<Vec<String>, SessionError>;
}
