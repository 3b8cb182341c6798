//! Request descriptors: verb, parameters, and per-call options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// HTTP verb supported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Uppercase wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the request body rather than the query.
    pub fn sends_body(self) -> bool {
        !matches!(self, Method::Get)
    }

    /// Whether the verb needs an `X-HTTP-Method-Override` header.
    pub fn needs_override(self) -> bool {
        matches!(self, Method::Put | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(Error::Config(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

/// Ordered request parameters.
///
/// Keys are unique; setting an existing key replaces its value in place so
/// the original order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Builder-style [`Params::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Merge `other` into `self`; values from `other` win on collision.
    pub fn merge(&mut self, other: Params) {
        for (key, value) in other.pairs {
            self.set(key, value);
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Authenticate with client credentials even if an access token exists.
    pub no_access_token: bool,
    /// The params already carry `client_id`/`client_secret`; send them as given.
    pub credentials_in_params: bool,
    /// Override the client's default timeout.
    pub timeout: Option<Duration>,
    /// Parse the response headers into [`crate::UserDeckClient::headers`].
    pub capture_headers: bool,
    /// Extra request headers, sent after the generated ones.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_access_token(mut self) -> Self {
        self.no_access_token = true;
        self
    }

    pub fn credentials_in_params(mut self) -> Self {
        self.credentials_in_params = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn capture_headers(mut self) -> Self {
        self.capture_headers = true;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A single API call, built per request and never persisted.
#[derive(Debug, Clone)]
pub struct Request {
    pub resource: String,
    pub method: Method,
    pub params: Params,
    pub options: RequestOptions,
}

impl Request {
    pub fn new(resource: impl Into<String>, method: Method) -> Self {
        Self {
            resource: resource.into(),
            method,
            params: Params::new(),
            options: RequestOptions::default(),
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("PUT".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        assert!("patch".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_wire_form() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!(!Method::Get.sends_body());
        assert!(Method::Post.sends_body());
        assert!(Method::Put.needs_override());
        assert!(!Method::Post.needs_override());
    }

    #[test]
    fn test_params_set_replaces_in_place() {
        let mut params = Params::from([("a", "1"), ("b", "2")]);
        params.set("a", "3");
        assert_eq!(params.encode(), "a=3&b=2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_merge_other_wins() {
        let mut params = Params::from([("grant_type", "password"), ("username", "u")]);
        params.merge(Params::from([("username", "override"), ("scope", "x")]));
        assert_eq!(params.get("username"), Some("override"));
        assert_eq!(params.encode(), "grant_type=password&username=override&scope=x");
    }

    #[test]
    fn test_params_encode_escapes() {
        let params = Params::new()
            .with("q", "a b&c")
            .with("email", "me@example.com");
        assert_eq!(params.encode(), "q=a+b%26c&email=me%40example.com");
    }

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .no_access_token()
            .capture_headers()
            .timeout(Duration::from_secs(5))
            .header("X-Trace", "1");
        assert!(options.no_access_token);
        assert!(options.capture_headers);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.headers, vec![("X-Trace".to_string(), "1".to_string())]);
    }
}
