use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::application::ports::{SessionError, SessionStore};

/// Process-local session storage
#[derive(Debug)]
pub struct InMemorySession {
    id: String,
    values: DashMap<String, Value>,
    last_seen: Mutex<Instant>,
}

impl InMemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: DashMap::new(),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

impl SessionStore for InMemorySession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, key: &str) -> Result<Option<Value>, SessionError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn insert(&self, key: &str, value: Value) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.values.iter().map(|entry| entry.key().clone()).collect())
    }
}

/// All live sessions of this process, keyed by session id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<InMemorySession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for `id`, or a new one under that id
    pub fn open(&self, id: &str) -> Arc<InMemorySession> {
        let session = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(InMemorySession::new(id)))
            .clone();
        session.touch();
        session
    }

    /// Start a session under a fresh random id
    pub fn create(&self) -> Arc<InMemorySession> {
        let id = Uuid::new_v4().simple().to_string();
        self.open(&id)
    }

    /// Throwaway session that is never registered, for requests that must
    /// not start one
    pub fn transient(&self) -> Arc<InMemorySession> {
        Arc::new(InMemorySession::new(Uuid::new_v4().simple().to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<InMemorySession>> {
        self.sessions.get(id).map(|s| {
            s.touch();
            s.clone()
        })
    }

    pub fn destroy(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop sessions idle for longer than `max_idle`; returns their ids
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.sessions.retain(|id, session| {
            let keep = session.idle_for() <= max_idle;
            if !keep {
                evicted.push(id.clone());
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_store_roundtrip() {
        let session = InMemorySession::new("s1");
        session.insert("csrf_submit", json!("abc")).unwrap();

        assert_eq!(session.get("csrf_submit").unwrap(), Some(json!("abc")));
        assert_eq!(session.keys().unwrap(), vec!["csrf_submit".to_string()]);

        session.remove("csrf_submit").unwrap();
        assert_eq!(session.get("csrf_submit").unwrap(), None);
    }

    #[test]
    fn test_registry_open_reuses_session() {
        let registry = SessionRegistry::new();
        let first = registry.open("abc");
        first.insert("k", json!(1)).unwrap();

        let second = registry.open("abc");
        assert_eq!(second.get("k").unwrap(), Some(json!(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_create_and_destroy() {
        let registry = SessionRegistry::new();
        let session = registry.create();
        let id = session.id();

        assert_eq!(id.len(), 32);
        assert!(registry.get(&id).is_some());
        assert!(registry.destroy(&id));
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn test_transient_session_is_not_registered() {
        let registry = SessionRegistry::new();
        let session = registry.transient();

        assert!(registry.get(&session.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_idle_keeps_recent_sessions() {
        let registry = SessionRegistry::new();
        registry.open("recent");

        assert!(registry.evict_idle(Duration::from_secs(60)).is_empty());

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(
            registry.evict_idle(Duration::from_millis(1)),
            vec!["recent".to_string()]
        );
        assert!(registry.is_empty());
    }
}
