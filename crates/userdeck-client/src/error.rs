//! Client error types.

use serde_json::Value;
use thiserror::Error;

use crate::transport::{TransportErrorKind, TransportMeta};

/// Client error type.
///
/// Every failure of a request surfaces as one of these. HTTP-level failures
/// ([`Error::Api`]) and transport failures ([`Error::Transport`]) are told
/// apart by [`Error::code`]: an HTTP status for the former, a transport code
/// for the latter.
#[derive(Debug, Error)]
pub enum Error {
    /// Server answered with a status of 400 or above.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message assembled from the error body.
        message: String,
        /// Decoded response body, if it was JSON.
        response: Option<Value>,
        /// Transport information about the exchange.
        meta: TransportMeta,
    },

    /// No response was obtained (connect failure, timeout, ...).
    #[error("Transport error: {message}")]
    Transport {
        /// Failure category.
        kind: TransportErrorKind,
        /// Transport error description.
        message: String,
        /// Request URL and time spent before the failure. `status` is 0.
        meta: TransportMeta,
    },

    /// A token exchange succeeded but returned no usable access token.
    #[error("Invalid token response: {0}")]
    InvalidToken(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The session store failed.
    #[error("Session error: {0}")]
    Session(#[from] userdeck_session::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status for API errors, transport code for transport errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Transport { kind, .. } => Some(kind.code()),
            _ => None,
        }
    }

    /// HTTP status, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decoded body of the failed response.
    pub fn response(&self) -> Option<&Value> {
        match self {
            Error::Api { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// Transport information of the failed exchange.
    pub fn meta(&self) -> Option<&TransportMeta> {
        match self {
            Error::Api { meta, .. } | Error::Transport { meta, .. } => Some(meta),
            _ => None,
        }
    }

    /// Check if this is a 401 from the server.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Api { status: 429, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Check if no response was obtained at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback message when the error body carries nothing usable.
pub(crate) const DEFAULT_API_ERROR: &str = "UserDeck API error.";

/// Build an error message from a decoded error body.
///
/// Joins the `error`, `error_description` and `message` fields, in that
/// order, when they are non-empty strings.
pub(crate) fn api_error_message(body: Option<&Value>) -> String {
    let parts: Vec<&str> = ["error", "error_description", "message"]
        .iter()
        .filter_map(|field| body?.get(field)?.as_str())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        DEFAULT_API_ERROR.to_string()
    } else {
        parts.join(": ")
    }
}
