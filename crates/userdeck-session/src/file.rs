//! File-backed session store.
//!
//! Each key is written as pretty-printed JSON to `<dir>/<prefix><name>.json`.
//! Reads are cached in-process so repeated lookups within one run don't touch
//! the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Result;
use crate::store::SessionStore;

/// Session store that persists values as JSON files in a directory.
#[derive(Debug)]
pub struct FileSession {
    dir: PathBuf,
    prefix: RwLock<String>,
    cache: RwLock<HashMap<String, Value>>,
}

impl FileSession {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: RwLock::new(String::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Set the key prefix (builder style).
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        *self.prefix.write() = prefix.into();
        self
    }

    /// The directory holding the session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that holds `name` under the current prefix.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", self.key(name)))
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix.read(), name)
    }
}

impl SessionStore for FileSession {
    fn put(&self, name: &str, value: &Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json)?;

        self.cache.write().insert(self.key(name), value.clone());
        tracing::debug!("Session value saved to {}", path.display());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Value>> {
        let key = self.key(name);
        if let Some(value) = self.cache.read().get(&key) {
            return Ok(Some(value.clone()));
        }

        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;

        self.cache.write().insert(key, value.clone());
        Ok(Some(value))
    }

    fn has(&self, name: &str) -> bool {
        self.cache.read().contains_key(&self.key(name)) || self.path_for(name).exists()
    }

    fn forget(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        self.cache.write().remove(&self.key(name));
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
    use tempfile::tempdir;

    #[test]
    fn test_file_session_new_is_empty() {
        let temp = tempdir().unwrap();
        let session = FileSession::new(temp.path());
        assert!(!session.has("token"));
        assert!(session.get("token").unwrap().is_none());
    }

    #[test]
    fn test_file_session_survives_new_instance() {
        let temp = tempdir().unwrap();
        let record = json!({"access_token": "a", "refresh_token": "r", "scope": "all"});

        let first = FileSession::new(temp.path()).with_prefix("ud_");
        first.put("token", &record).unwrap();
        assert!(temp.path().join("ud_token.json").exists());

        let second = FileSession::new(temp.path()).with_prefix("ud_");
        assert!(second.has("token"));
        assert_eq!(second.get("token").unwrap(), Some(record));
    }

    #[test]
    fn test_file_session_forget() {
        let temp = tempdir().unwrap();
        let session = FileSession::new(temp.path());

        session.put("token", &json!({"access_token": "a"})).unwrap();
        session.forget("token").unwrap();

        assert!(!session.has("token"));
        assert!(!session.path_for("token").exists());

        // Forgetting twice is fine.
        session.forget("token").unwrap();
    }

    #[test]
    fn test_file_session_creates_directory() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        let session = FileSession::new(&nested);

        session.put("token", &json!("x")).unwrap();
        assert!(nested.join("token.json").exists());
    }

    #[test]
    fn test_file_session_corrupt_file_is_error() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("token.json"), "{not json").unwrap();

        let session = FileSession::new(temp.path());
        assert!(session.has("token"));
        assert!(session.get("token").is_err());
    }
}
