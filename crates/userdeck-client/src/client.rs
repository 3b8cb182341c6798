//! Main client implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::{Url, form_urlencoded};
use userdeck_session::{MemorySession, SharedSession};

use crate::config::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_AUTHORIZE_URL, DEFAULT_SESSION_PREFIX,
    DEFAULT_TIMEOUT_SECS,
};
use crate::dispatch::{ClientIdentity, Dispatcher, ResponseHeaders};
use crate::error::{Error, Result};
use crate::request::{Method, Params, Request, RequestOptions};
use crate::token::{TokenManager, TokenRecord};
use crate::transport::{ReqwestTransport, Transport};

/// UserDeck API client.
///
/// Cheap to clone; clones share the token cache, account selector and
/// session store.
///
/// # Example
///
/// ```no_run
/// use userdeck_client::{Params, RequestOptions, UserDeckClient};
///
/// # async fn example() -> userdeck_client::Result<()> {
/// let client = UserDeckClient::builder()
///     .client_id("my-client")
///     .client_secret("s3cret")
///     .build()?;
///
/// client.login("me@example.com", "password", Params::new()).await?;
/// let tickets = client
///     .get("tickets", Params::from([("page", "1")]), RequestOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct UserDeckClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    tokens: TokenManager,
    authorize_url: String,
}

impl fmt::Debug for UserDeckClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDeckClient")
            .field("api_url", &self.api_url())
            .field("authorize_url", &self.inner.authorize_url)
            .finish_non_exhaustive()
    }
}

impl UserDeckClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from a loaded configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Base URL for API requests.
    pub fn api_url(&self) -> &str {
        self.tokens().dispatcher().api_url()
    }

    /// OAuth authorize endpoint.
    pub fn authorize_url(&self) -> &str {
        &self.inner.authorize_url
    }

    /// The session store holding the token record.
    pub fn session(&self) -> &SharedSession {
        self.tokens().session()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Perform a GET request.
    pub async fn get(
        &self,
        resource: &str,
        params: Params,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        self.request(resource, Method::Get, params, options).await
    }

    /// Perform a POST request.
    pub async fn post(
        &self,
        resource: &str,
        params: Params,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        self.request(resource, Method::Post, params, options).await
    }

    /// Perform a PUT request.
    pub async fn put(
        &self,
        resource: &str,
        params: Params,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        self.request(resource, Method::Put, params, options).await
    }

    /// Perform a DELETE request.
    pub async fn delete(
        &self,
        resource: &str,
        params: Params,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        self.request(resource, Method::Delete, params, options).await
    }

    /// Perform a request, refreshing the login once on a 401.
    ///
    /// The refresh is only attempted when a token record is stored. If it
    /// succeeds the request is retried exactly once and the retry's outcome
    /// is returned as is; otherwise the original 401 is returned.
    pub async fn request(
        &self,
        resource: &str,
        method: Method,
        params: Params,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let request = Request::new(resource, method)
            .params(params)
            .options(options);

        match self.tokens().dispatch(&request).await {
            Err(err) if err.is_unauthorized() && self.tokens().has_token() => {
                tracing::debug!("{} {} returned 401, refreshing token", method, resource);
                if self
                    .tokens()
                    .refresh_login_token(RequestOptions::default())
                    .await
                {
                    return self.tokens().dispatch(&request).await;
                }
                Err(err)
            }
            result => result,
        }
    }

    /// Headers captured by the last request made with
    /// [`RequestOptions::capture_headers`].
    pub fn headers(&self) -> Option<ResponseHeaders> {
        self.tokens().dispatcher().last_headers()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────

    /// Log in with the password grant and store the token.
    ///
    /// Only available to clients with the password grant enabled; the
    /// provider's rejection surfaces as an [`Error::Api`].
    pub async fn login(&self, email: &str, password: &str, params: Params) -> Result<TokenRecord> {
        self.tokens().login(email, password, params).await
    }

    /// Exchange an authorization code and store the token.
    pub async fn login_with_code(
        &self,
        code: &str,
        redirect_uri: &str,
        options: RequestOptions,
    ) -> Result<TokenRecord> {
        self.tokens()
            .login_with_code(code, redirect_uri, options)
            .await
    }

    /// Fetch a token with the client's own credentials.
    ///
    /// The record is returned, not stored; install it with
    /// [`UserDeckClient::set_token`] if it should back later requests.
    pub async fn request_access_token(
        &self,
        params: Params,
        options: RequestOptions,
    ) -> Result<TokenRecord> {
        self.tokens().request_access_token(params, options).await
    }

    /// Try to refresh the stored login. Returns whether it worked.
    pub async fn refresh_login_token(&self, options: RequestOptions) -> bool {
        self.tokens().refresh_login_token(options).await
    }

    /// Forget the stored token record and the cached access token.
    pub fn logout(&self) -> Result<()> {
        self.tokens().logout()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Current access token, from memory or the session store.
    pub fn access_token(&self) -> Result<Option<String>> {
        self.tokens().access_token()
    }

    /// Use `token` for subsequent requests without storing it.
    pub fn set_access_token(&self, token: impl Into<String>) {
        self.tokens().set_access_token(Some(token.into()));
    }

    /// The stored token record.
    pub fn token_info(&self) -> Result<Option<TokenRecord>> {
        self.tokens().token_info()
    }

    /// Store a token record obtained elsewhere.
    pub fn set_token(&self, record: &TokenRecord) -> Result<()> {
        self.tokens().set_token(record)
    }

    /// Build the URL that starts an authorization-code login.
    ///
    /// Non-empty `redirect_uri`, `scope` and `state` values are URL-encoded
    /// before the query string is built, so they reach the provider encoded
    /// twice. `response_type` and `client_id` are always set by the client.
    pub fn authorization_url(&self, params: Params) -> String {
        let mut params = params;
        for field in ["redirect_uri", "scope", "state"] {
            let encoded = params
                .get(field)
                .filter(|v| !v.is_empty())
                .map(|v| form_urlencoded::byte_serialize(v.as_bytes()).collect::<String>());
            if let Some(encoded) = encoded {
                params.set(field, encoded);
            }
        }

        params.set("response_type", "code");
        match &self.tokens().dispatcher().identity().client_id {
            Some(id) => params.set("client_id", id.as_str()),
            None => {
                params.remove("client_id");
            }
        }

        format!("{}?{}", self.inner.authorize_url, params.encode())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Account selector
    // ─────────────────────────────────────────────────────────────────────────

    /// Send `account` as the `Account` header on every subsequent request.
    pub fn set_account(&self, account: impl fmt::Display) {
        self.tokens()
            .dispatcher()
            .set_account(Some(account.to_string()));
    }

    /// Stop sending the `Account` header.
    pub fn clear_account(&self) {
        self.tokens().dispatcher().set_account(None);
    }

    /// The active account, if set.
    pub fn account(&self) -> Option<String> {
        self.tokens().dispatcher().account()
    }
}

/// Builder for creating a [`UserDeckClient`].
pub struct ClientBuilder {
    api_url: String,
    authorize_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Duration,
    session: Option<SharedSession>,
    session_prefix: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    follow_redirects: bool,
    user_agent: Option<String>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("api_url", &self.api_url)
            .field("authorize_url", &self.authorize_url)
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .field("session_prefix", &self.session_prefix)
            .field("follow_redirects", &self.follow_redirects)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session: None,
            session_prefix: None,
            transport: None,
            follow_redirects: true,
            user_agent: None,
        }
    }

    /// Apply every setting from a [`ClientConfig`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.timeout = config.timeout();
        self.api_url = config.api_url;
        self.authorize_url = config.authorize_url;
        self.client_id = config.client_id;
        self.client_secret = config.client_secret;
        self.session_prefix = Some(config.session_prefix);
        self.follow_redirects = config.follow_redirects;
        self
    }

    /// Set the API base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the OAuth authorize endpoint.
    pub fn authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    /// Set the OAuth client id.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the OAuth client secret.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a specific session store (defaults to an in-memory store).
    pub fn session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the session key prefix.
    pub fn session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = Some(prefix.into());
        self
    }

    /// Use a custom transport instead of the built-in `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Follow HTTP redirects (default: true).
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<UserDeckClient> {
        Url::parse(&self.api_url)?;
        Url::parse(&self.authorize_url)?;

        let session = match self.session {
            Some(session) => {
                if let Some(prefix) = &self.session_prefix {
                    session.set_prefix(prefix);
                }
                session
            }
            None => {
                let prefix = self
                    .session_prefix
                    .as_deref()
                    .unwrap_or(DEFAULT_SESSION_PREFIX);
                Arc::new(MemorySession::with_prefix(prefix)) as SharedSession
            }
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| format!("userdeck-client/{}", env!("CARGO_PKG_VERSION")));
                let transport = ReqwestTransport::new(self.follow_redirects, &user_agent)
                    .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
                Arc::new(transport) as Arc<dyn Transport>
            }
        };

        let identity = ClientIdentity::new(self.client_id, self.client_secret);
        let dispatcher = Dispatcher::new(transport, self.api_url, identity, self.timeout);

        Ok(UserDeckClient {
            inner: Arc::new(ClientInner {
                tokens: TokenManager::new(dispatcher, session),
                authorize_url: self.authorize_url,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
