//! The session store contract.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// Key/value persistence for client session state.
///
/// Every operation is keyed by a name that the backend namespaces with its
/// [prefix](SessionStore::prefix). Values are arbitrary JSON so token records
/// round-trip without the store knowing their shape.
///
/// There is no concurrency control: last write wins, and a single caller per
/// store instance is assumed.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Persist `value` under `name`.
    fn put(&self, name: &str, value: &Value) -> Result<()>;

    /// Fetch the value stored under `name`.
    ///
    /// Returns `Ok(None)` if nothing was stored or the value was forgotten.
    fn get(&self, name: &str) -> Result<Option<Value>>;

    /// Check whether a value is currently stored under `name`.
    fn has(&self, name: &str) -> bool;

    /// Remove the value stored under `name`. A no-op if nothing is stored.
    fn forget(&self, name: &str) -> Result<()>;

    /// Set the key prefix used by all other operations.
    fn set_prefix(&self, prefix: &str);

    /// The current key prefix.
    fn prefix(&self) -> String;
}

/// Session store shared between the client and its host.
pub type SharedSession = Arc<dyn SessionStore>;
