//! Pluggable session storage for UserDeck OAuth tokens.
//!
//! The API client keeps its current token record in a [`SessionStore`] so the
//! login survives across process invocations (or across requests in a web
//! host). Three backends ship with the crate:
//!
//! - [`MemorySession`]: process-local map, useful for tests and daemons
//! - [`FileSession`]: one JSON file per key in a directory
//! - [`CookieSession`]: explicit browser cookies: reads the incoming
//!   `Cookie` header and queues `Set-Cookie` lines for the host to emit
//!
//! # Example
//!
//! ```rust
//! use userdeck_session::{MemorySession, SessionStore};
//!
//! let session = MemorySession::with_prefix("ud_");
//! session.put("token", &serde_json::json!({"access_token": "abc"})).unwrap();
//! assert!(session.has("token"));
//! ```

mod cookie;
mod error;
mod file;
mod memory;
mod store;

pub use cookie::CookieSession;
pub use error::{Error, Result};
pub use file::FileSession;
pub use memory::MemorySession;
pub use store::{SessionStore, SharedSession};
