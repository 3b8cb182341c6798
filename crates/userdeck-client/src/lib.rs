//! OAuth2 HTTP client for the UserDeck API.
//!
//! The client issues GET/POST/PUT/DELETE calls against the API, keeps the
//! user's token record in a pluggable [`SessionStore`], and transparently
//! refreshes the login once when a request comes back 401.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use userdeck_client::{FileSession, Params, RequestOptions, UserDeckClient};
//!
//! # async fn example() -> userdeck_client::Result<()> {
//! let client = UserDeckClient::builder()
//!     .client_id("my-client")
//!     .client_secret("s3cret")
//!     .session(Arc::new(FileSession::new("/var/lib/myapp/session")))
//!     .build()?;
//!
//! // Send the user to UserDeck to approve access...
//! let url = client.authorization_url(Params::from([
//!     ("redirect_uri", "https://myapp.example.com/callback"),
//!     ("state", "xyz"),
//! ]));
//! println!("Visit {}", url);
//!
//! // ...then exchange the code they come back with.
//! client
//!     .login_with_code("the-code", "https://myapp.example.com/callback", RequestOptions::default())
//!     .await?;
//!
//! let me = client.get("me", Params::new(), RequestOptions::default()).await?;
//! println!("{:?}", me);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`transport`]: the HTTP capability and its `reqwest` implementation
//! - [`request`]: verbs, ordered parameters and per-call options
//! - [`token`]: token records and the grant/refresh lifecycle
//! - [`client`]: the [`UserDeckClient`] facade and its builder

pub mod client;
pub mod config;
mod dispatch;
pub mod error;
pub mod request;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ClientBuilder, UserDeckClient};
pub use config::ClientConfig;
pub use dispatch::{ClientIdentity, ResponseHeaders};
pub use error::{Error, Result};
pub use request::{Method, Params, Request, RequestOptions};
pub use token::{TOKEN_KEY, TOKEN_RESOURCE, TokenRecord};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportErrorKind, TransportMeta,
    TransportRequest, TransportResponse,
};

pub use userdeck_session::{CookieSession, FileSession, MemorySession, SessionStore, SharedSession};
