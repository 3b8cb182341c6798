//! Common test utilities for integration tests.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use userdeck_client::{MemorySession, SessionStore, SharedSession, TOKEN_KEY, UserDeckClient};
use wiremock::MockServer;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";

/// Build a client pointed at `server` with the given session store.
pub fn client_with_session(server: &MockServer, session: SharedSession) -> Result<UserDeckClient> {
    let client = UserDeckClient::builder()
        .api_url(server.uri())
        .authorize_url(format!("{}/oauth/authorize", server.uri()))
        .client_id(CLIENT_ID)
        .client_secret(CLIENT_SECRET)
        .session(session)
        .session_prefix("ud_")
        .build()?;
    Ok(client)
}

/// Build a client pointed at `server` backed by a fresh in-memory session.
pub fn client_for(server: &MockServer) -> Result<(UserDeckClient, Arc<MemorySession>)> {
    let session = Arc::new(MemorySession::new());
    let client = client_with_session(server, session.clone())?;
    Ok((client, session))
}

/// Put a token record straight into the session.
pub fn store_token(session: &MemorySession, record: Value) -> Result<()> {
    session.put(TOKEN_KEY, &record)?;
    Ok(())
}

/// Mount a token endpoint answering grants containing `grant` with `token`.
pub async fn mount_token_endpoint(server: &MockServer, grant: &str, token: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(body_string_contains(format!("grant_type={}", grant)))
        .respond_with(ResponseTemplate::new(200).set_body_json(token))
        .expect(times)
        .mount(server)
        .await;
}

/// Body of a standard OAuth error.
pub fn oauth_error(error: &str, description: &str) -> Value {
    json!({"error": error, "error_description": description})
}
