//! Token records and the OAuth token lifecycle.
//!
//! All grants are exchanged at [`TOKEN_RESOURCE`] with client-credential
//! authentication. The resulting record is persisted in the session store
//! under [`TOKEN_KEY`]; the access token itself is cached in memory and
//! re-read from the store whenever the cache is cleared.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use userdeck_session::SharedSession;

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::request::{Method, Params, Request, RequestOptions};

/// Session key holding the token record.
pub const TOKEN_KEY: &str = "token";

/// Resource that exchanges grants for tokens.
pub const TOKEN_RESOURCE: &str = "oauth/access_token";

/// Token record as returned by the provider.
///
/// Fields other than the two tokens are kept verbatim in `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenRecord {
    /// Create a record with just an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            extra: Map::new(),
        }
    }

    /// Set the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Parse a provider response, requiring a non-empty access token.
    pub fn from_value(value: Value) -> Result<Self> {
        let record: TokenRecord = serde_json::from_value(value)
            .map_err(|e| Error::InvalidToken(format!("Malformed token record: {}", e)))?;
        if record.access_token.is_empty() {
            return Err(Error::InvalidToken("Empty access token".to_string()));
        }
        Ok(record)
    }

    /// Provider-specific field, e.g. `expires_in` or `scope`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.extra.get(field)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("extra", &self.extra)
            .finish()
    }
}

/// Acquires, persists, refreshes and forgets tokens.
#[derive(Debug)]
pub(crate) struct TokenManager {
    dispatcher: Dispatcher,
    session: SharedSession,
    access_token: RwLock<Option<String>>,
}

impl TokenManager {
    pub(crate) fn new(dispatcher: Dispatcher, session: SharedSession) -> Self {
        Self {
            dispatcher,
            session,
            access_token: RwLock::new(None),
        }
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub(crate) fn session(&self) -> &SharedSession {
        &self.session
    }

    /// The current access token: cached, else read from the session.
    pub(crate) fn access_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.access_token.read().clone() {
            return Ok(Some(token));
        }

        let Some(stored) = self.session.get(TOKEN_KEY)? else {
            return Ok(None);
        };

        match stored.get("access_token").and_then(Value::as_str) {
            Some(token) => {
                *self.access_token.write() = Some(token.to_string());
                Ok(Some(token.to_string()))
            }
            None => {
                tracing::warn!("Stored token record has no access_token");
                Ok(None)
            }
        }
    }

    /// Replace the in-memory token without touching the session.
    pub(crate) fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    /// The stored token record, if any.
    pub(crate) fn token_info(&self) -> Result<Option<TokenRecord>> {
        self.session
            .get(TOKEN_KEY)?
            .map(TokenRecord::from_value)
            .transpose()
    }

    pub(crate) fn has_token(&self) -> bool {
        self.session.has(TOKEN_KEY)
    }

    /// Persist `record` and drop the cached access token.
    pub(crate) fn set_token(&self, record: &TokenRecord) -> Result<()> {
        self.session.put(TOKEN_KEY, &serde_json::to_value(record)?)?;
        *self.access_token.write() = None;
        tracing::debug!("Token record stored in session");
        Ok(())
    }

    /// Dispatch `request` with whatever token currently applies.
    pub(crate) async fn dispatch(&self, request: &Request) -> Result<Option<Value>> {
        let token = if request.options.no_access_token {
            None
        } else {
            self.access_token()?
        };
        self.dispatcher.dispatch(request, token.as_deref()).await
    }

    /// POST `params` to the token resource and parse the record.
    async fn exchange(&self, params: Params, options: RequestOptions) -> Result<TokenRecord> {
        let request = Request::new(TOKEN_RESOURCE, Method::Post)
            .params(params)
            .options(RequestOptions {
                no_access_token: true,
                ..options
            });

        let body = self
            .dispatch(&request)
            .await?
            .ok_or_else(|| Error::InvalidToken("Empty token response".to_string()))?;
        TokenRecord::from_value(body)
    }

    /// Password grant. Extra params win over the generated ones.
    pub(crate) async fn login(
        &self,
        email: &str,
        password: &str,
        extra: Params,
    ) -> Result<TokenRecord> {
        self.logout()?;

        let mut params = Params::from([
            ("grant_type", "password"),
            ("username", email),
            ("password", password),
        ]);
        params.merge(extra);

        let record = self.exchange(params, RequestOptions::default()).await?;
        self.set_token(&record)?;
        tracing::info!("Logged in as {}", email);
        Ok(record)
    }

    /// Authorization-code grant.
    pub(crate) async fn login_with_code(
        &self,
        code: &str,
        redirect_uri: &str,
        options: RequestOptions,
    ) -> Result<TokenRecord> {
        self.logout()?;

        let params = Params::from([
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ]);

        let record = self.exchange(params, options).await?;
        self.set_token(&record)?;
        tracing::info!("Logged in with authorization code");
        Ok(record)
    }

    /// Client-credential exchange. Caller params win; nothing is stored.
    pub(crate) async fn request_access_token(
        &self,
        params: Params,
        options: RequestOptions,
    ) -> Result<TokenRecord> {
        let identity = self.dispatcher.identity();
        let mut merged = Params::new();
        if let Some(id) = &identity.client_id {
            merged.set("client_id", id.as_str());
        }
        if let Some(secret) = &identity.client_secret {
            merged.set("client_secret", secret.as_str());
        }
        merged.merge(params);

        self.exchange(merged, options.credentials_in_params()).await
    }

    /// Exchange the stored refresh token for a new record.
    ///
    /// Never fails: every problem is logged and reported as `false`.
    pub(crate) async fn refresh_login_token(&self, options: RequestOptions) -> bool {
        let record = match self.token_info() {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Cannot refresh, stored token unreadable: {}", e);
                return false;
            }
        };

        let Some(refresh_token) = record.refresh_token.filter(|t| !t.is_empty()) else {
            tracing::debug!("No refresh token stored");
            return false;
        };

        let params = Params::from([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ]);

        let mut new_record = match self.exchange(params, options).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                return false;
            }
        };

        if new_record.refresh_token.is_none() {
            new_record.refresh_token = Some(refresh_token);
        }

        if let Err(e) = self.set_token(&new_record) {
            tracing::warn!("Failed to store refreshed token: {}", e);
            return false;
        }

        tracing::info!("Access token refreshed");
        true
    }

    /// Forget the stored record and the cached token.
    pub(crate) fn logout(&self) -> Result<()> {
        self.session.forget(TOKEN_KEY)?;
        *self.access_token.write() = None;
        tracing::debug!("Session token cleared");
        Ok(())
    }
}
