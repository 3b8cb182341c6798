//! In-memory session store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Result;
use crate::store::SessionStore;

/// Process-local session store.
///
/// Nothing survives the process; intended for tests, long-running daemons,
/// and hosts that persist the token themselves.
#[derive(Debug, Default)]
pub struct MemorySession {
    prefix: RwLock<String>,
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    /// Create an empty store without a prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given key prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: RwLock::new(prefix.into()),
            values: RwLock::new(HashMap::new()),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix.read(), name)
    }
}

impl SessionStore for MemorySession {
    fn put(&self, name: &str, value: &Value) -> Result<()> {
        let key = self.key(name);
        self.values.write().insert(key, value.clone());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Value>> {
        let key = self.key(name);
        Ok(self.values.read().get(&key).cloned())
    }

    fn has(&self, name: &str) -> bool {
        let key = self.key(name);
        self.values.read().contains_key(&key)
    }

    fn forget(&self, name: &str) -> Result<()> {
        let key = self.key(name);
        self.values.write().remove(&key);
        Ok(())
    }

    fn set_prefix(&self, prefix: &str) {
        *self.prefix.write() = prefix.to_string();
    }

    fn prefix(&self) -> String {
        self.prefix.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get_has_forget() {
        let session = MemorySession::new();
        assert!(!session.has("token"));
        assert!(session.get("token").unwrap().is_none());

        session.put("token", &json!({"access_token": "a"})).unwrap();
        assert!(session.has("token"));
        assert_eq!(
            session.get("token").unwrap(),
            Some(json!({"access_token": "a"}))
        );

        session.forget("token").unwrap();
        assert!(!session.has("token"));
        assert!(session.get("token").unwrap().is_none());
    }

    #[test]
    fn test_forget_missing_is_noop() {
        let session = MemorySession::new();
        session.forget("nothing").unwrap();
        assert!(!session.has("nothing"));
    }

    #[test]
    fn test_last_write_wins() {
        let session = MemorySession::new();
        session.put("k", &json!(1)).unwrap();
        session.put("k", &json!(2)).unwrap();
        assert_eq!(session.get("k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_prefix_namespaces_keys() {
        let session = MemorySession::with_prefix("ud_");
        assert_eq!(session.prefix(), "ud_");
        session.put("token", &json!("x")).unwrap();

        session.set_prefix("other_");
        assert!(!session.has("token"));

        session.set_prefix("ud_");
        assert_eq!(session.get("token").unwrap(), Some(json!("x")));
    }
}
