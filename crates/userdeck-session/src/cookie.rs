//! Cookie-backed session store.
//!
//! The store never touches process-wide state. The host hands it the
//! incoming request's `Cookie` header at construction and, once the request
//! is handled, drains the queued `Set-Cookie` lines with
//! [`CookieSession::take_set_cookies`] and writes them onto its response.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::Result;
use crate::store::SessionStore;

/// Lifetime of a stored cookie (five years).
const COOKIE_LIFETIME_SECS: i64 = 157_680_000;

/// How far in the past an expiring cookie is dated (thirty days).
const COOKIE_EXPIRED_SECS: i64 = 2_592_000;

/// Session store backed by browser cookies.
#[derive(Debug, Default)]
pub struct CookieSession {
    prefix: RwLock<String>,
    /// Raw cookie values received with the request, keyed by full cookie name.
    incoming: RwLock<HashMap<String, String>>,
    /// Values written during this request, keyed by full cookie name.
    cache: RwLock<HashMap<String, Value>>,
    /// `Set-Cookie` header values waiting to be sent.
    pending: Mutex<Vec<String>>,
}

impl CookieSession {
    /// Create a store with no incoming cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from the value of an incoming `Cookie` request header.
    ///
    /// Pairs are separated by `;`; malformed pairs are skipped.
    pub fn from_cookie_header(header: &str) -> Self {
        let incoming = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();

        Self {
            incoming: RwLock::new(incoming),
            ..Self::default()
        }
    }

    /// Set the key prefix (builder style).
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        *self.prefix.write() = prefix.into();
        self
    }

    /// Drain the `Set-Cookie` header values queued by `put` and `forget`.
    pub fn take_set_cookies(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix.read(), name)
    }

    fn queue(&self, key: &str, value: &str, max_age: i64) {
        let expires = (Utc::now() + Duration::seconds(max_age))
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let max_age = max_age.max(0);
        self.pending.lock().push(format!(
            "{key}={value}; Expires={expires}; Max-Age={max_age}; Path=/"
        ));
    }
}

impl SessionStore for CookieSession {
    fn put(&self, name: &str, value: &Value) -> Result<()> {
        let key = self.key(name);
        let json = serde_json::to_string(value)?;
        self.queue(&key, &urlencoding::encode(&json), COOKIE_LIFETIME_SECS);
        self.cache.write().insert(key, value.clone());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Value>> {
        let key = self.key(name);
        if let Some(value) = self.cache.read().get(&key) {
            return Ok(Some(value.clone()));
        }

        let Some(raw) = self.incoming.read().get(&key).cloned() else {
            return Ok(None);
        };

        // Cookie contents come from the browser; treat garbage as absent.
        let decoded = urlencoding::decode(&raw).map(|s| s.into_owned());
        match decoded.map(|s| serde_json::from_str::<Value>(&s)) {
            Ok(Ok(value)) => Ok(Some(value)),
            _ => {
                tracing::warn!("Ignoring undecodable session cookie {}", key);
                Ok(None)
            }
        }
    }

    fn has(&self, name: &str) -> bool {
        let key = self.key(name);
        self.cache.read().contains_key(&key) || self.incoming.read().contains_key(&key)
    }

    fn forget(&self, name: &str) -> Result<()> {
        if !self.has(name) {
            return Ok(());
        }

        let key = self.key(name);
        self.queue(&key, "", -COOKIE_EXPIRED_SECS);
        self.cache.write().remove(&key);
        self.incoming.write().remove(&key);
        Ok(())
    }

    fn set_prefix(&self, prefix: &str) {
        *self.prefix.write() = prefix.to_string();
    }

    fn prefix(&self) -> String {
        self.prefix.read().clone()
    }
}
