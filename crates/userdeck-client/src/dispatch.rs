//! Request dispatch: build one HTTP call, run it, classify the outcome.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::{Error, Result, api_error_message};
use crate::request::Request;
use crate::transport::{Transport, TransportMeta, TransportRequest, TransportResponse};

const REDACTED: &str = "[REDACTED]";

/// Response headers captured from the last request.
pub type ResponseHeaders = BTreeMap<String, String>;

/// The API consumer's own credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ClientIdentity {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Both id and secret, when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = self.client_secret.as_deref().filter(|s| !s.is_empty())?;
        Some((id, secret))
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| REDACTED),
            )
            .finish()
    }
}

/// Builds and executes API calls against one base URL.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    api_url: String,
    identity: ClientIdentity,
    timeout: Duration,
    account: RwLock<Option<String>>,
    last_headers: RwLock<Option<ResponseHeaders>>,
}

impl Dispatcher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        api_url: impl Into<String>,
        identity: ClientIdentity,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            api_url: api_url.into(),
            identity,
            timeout,
            account: RwLock::new(None),
            last_headers: RwLock::new(None),
        }
    }

    pub(crate) fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub(crate) fn account(&self) -> Option<String> {
        self.account.read().clone()
    }

    pub(crate) fn set_account(&self, account: Option<String>) {
        *self.account.write() = account;
    }

    pub(crate) fn last_headers(&self) -> Option<ResponseHeaders> {
        self.last_headers.read().clone()
    }

    /// Build the URL for a resource path.
    pub(crate) fn url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            resource.trim_matches('/')
        )
    }

    /// Assemble the wire request for `request`.
    ///
    /// `access_token` is the client's current token; it is ignored when the
    /// request asks for client-credential authentication.
    pub(crate) fn build(&self, request: &Request, access_token: Option<&str>) -> TransportRequest {
        let method = request.method;
        let mut url = self.url(&request.resource);
        let mut params = request.params.clone();

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

        let bearer = access_token
            .filter(|t| !t.is_empty())
            .filter(|_| !request.options.no_access_token);
        if let Some(token) = bearer {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        } else if let Some((id, secret)) = self
            .identity
            .credentials()
            .filter(|_| !request.options.credentials_in_params)
        {
            params.set("client_id", id);
            params.set("client_secret", secret);
        }

        if let Some(account) = self.account() {
            headers.push(("Account".to_string(), account));
        }

        if method.needs_override() {
            headers.push((
                "X-HTTP-Method-Override".to_string(),
                method.as_str().to_string(),
            ));
        }

        let mut body = None;
        if !params.is_empty() {
            let encoded = params.encode();
            if method.sends_body() {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                body = Some(encoded);
            } else {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&encoded);
            }
        }

        headers.extend(request.options.headers.iter().cloned());

        TransportRequest {
            method,
            url,
            headers,
            body,
            timeout: request.options.timeout.unwrap_or(self.timeout),
        }
    }

    /// Execute `request` and decode its JSON body.
    ///
    /// Returns `Ok(None)` when the body is empty or not JSON.
    pub(crate) async fn dispatch(
        &self,
        request: &Request,
        access_token: Option<&str>,
    ) -> Result<Option<Value>> {
        let wire = self.build(request, access_token);
        let url = self.redact(&wire.url);
        tracing::debug!("{} {}", wire.method, url);

        *self.last_headers.write() = None;

        let started = Instant::now();
        let TransportResponse { head, body, mut meta } = match self.transport.send(wire).await {
            Ok(response) => response,
            Err(e) => {
                let message = self.redact(&e.message);
                tracing::debug!("{} failed: {}", url, message);
                return Err(Error::Transport {
                    kind: e.kind,
                    message,
                    meta: TransportMeta {
                        url,
                        total_time: started.elapsed(),
                        ..TransportMeta::default()
                    },
                });
            }
        };
        meta.url = self.redact(&meta.url);

        tracing::debug!(
            "{} responded {} in {:?}",
            meta.url,
            meta.status,
            meta.total_time
        );

        if request.options.capture_headers {
            *self.last_headers.write() = Some(parse_header_block(&head));
        }

        let body = decode_body(&body);

        if meta.status >= 400 {
            return Err(Error::Api {
                status: meta.status,
                message: api_error_message(body.as_ref()),
                response: body,
                meta,
            });
        }

        Ok(body)
    }

    /// Mask the client secret in a URL or in a message quoting one.
    pub(crate) fn redact(&self, text: &str) -> String {
        match self.identity.client_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => {
                let encoded: String = form_urlencoded::byte_serialize(secret.as_bytes()).collect();
                text.replace(
                    &format!("client_secret={}", encoded),
                    &format!("client_secret={}", REDACTED),
                )
            }
            None => text.to_string(),
        }
    }
}

/// Parse a raw header block into a name/value map.
///
/// Lines without a colon (the status line, blank lines) are ignored; later
/// duplicates overwrite earlier ones.
pub(crate) fn parse_header_block(head: &str) -> ResponseHeaders {
    head.replace('\r', "")
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Decode a response body as JSON, treating empty or malformed bodies as absent.
pub(crate) fn decode_body(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(|v| !v.is_null())
}
