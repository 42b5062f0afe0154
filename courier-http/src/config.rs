//! Client defaults and per-request configuration.

use crate::error::{ClientError, Result};
use crate::transport::FormPart;
use courier_cache::CacheStore;
use futures::future::AbortRegistration;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Cookie-sending behavior forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Never send cookies.
    Omit,
    /// Send cookies for same-origin and cross-origin requests.
    Include,
    /// Send cookies for same-origin requests only.
    SameOrigin,
}

impl Credentials {
    /// Wire-level name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::Include => "include",
            Self::SameOrigin => "same-origin",
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-origin behavior forwarded to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Same-origin requests only.
    SameOrigin,
    /// Cross-origin requests with CORS.
    Cors,
    /// Cross-origin requests without CORS response headers.
    NoCors,
}

impl Mode {
    /// Wire-level name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameOrigin => "same-origin",
            Self::Cors => "cors",
            Self::NoCors => "no-cors",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention policy for the fingerprint cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// No de-duplication at all: every call performs a fresh transport call.
    Bypass,
    /// De-duplicate while in flight; drop the entry as soon as it settles.
    UntilSettled,
    /// Keep a successful settlement for the given duration.
    Retain(Duration),
    /// Keep a successful settlement until explicitly cleared.
    Forever,
}

/// Process-wide defaults, overlaid under every request.
///
/// Constructed once (directly or through [`ClientConfig::builder`]) and
/// mutated afterwards only through
/// [`HttpClient::update_defaults`](crate::HttpClient::update_defaults).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL prefixed to relative request URLs.
    pub base_url: Option<String>,
    /// Method used when a request does not name one.
    pub method: Method,
    /// Default cookie behavior.
    pub credentials: Credentials,
    /// Default cross-origin behavior.
    pub mode: Mode,
    /// Default request timeout.
    pub timeout: Duration,
    /// Message carried by timeout errors.
    pub timeout_error_message: String,
    /// Status carried by timeout errors.
    pub timeout_error_status: u16,
    /// Content type applied to POST/PUT bodies without one.
    pub default_content_type: String,
    /// Header keys copied from an external header source into each request.
    pub inject_header_keys: Vec<String>,
    /// Headers merged under every request's own headers.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            method: Method::POST,
            credentials: Credentials::Include,
            mode: Mode::Cors,
            timeout: Duration::from_secs(120),
            timeout_error_message: "timeout".to_string(),
            timeout_error_status: 504,
            default_content_type: "application/json; charset=UTF-8".to_string(),
            inject_header_keys: [
                "x-request-id",
                "x-b3-traceid",
                "x-b3-spanid",
                "x-b3-parentspanid",
                "x-b3-sampled",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for client defaults.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL for all requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the default request method.
    pub fn method(mut self, method: Method) -> Self {
        self.config.method = method;
        self
    }

    /// Set the default cookie behavior.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Set the default cross-origin behavior.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the message and status carried by timeout errors.
    pub fn timeout_error(mut self, message: impl Into<String>, status: u16) -> Self {
        self.config.timeout_error_message = message.into();
        self.config.timeout_error_status = status;
        self
    }

    /// Set the content type applied to POST/PUT bodies without one.
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.default_content_type = content_type.into();
        self
    }

    /// Replace the allow-list of header keys injected from an external
    /// header source.
    pub fn inject_header_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.inject_header_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Add a default header for all requests.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Per-request configuration. Every field is optional; absent fields fall
/// back to the client defaults during the merge.
#[derive(Default)]
pub struct RequestConfig {
    /// Request URL, absolute or relative to the base URL.
    pub url: Option<String>,
    /// Base URL override for this request.
    pub base_url: Option<String>,
    /// Method override for this request.
    pub method: Option<Method>,
    /// Request headers (lowercase keys by convention).
    pub headers: BTreeMap<String, String>,
    /// Body data; folded into the query string for GET requests.
    pub data: Option<Value>,
    /// Extra query parameters for body-bearing methods.
    pub query: Option<Value>,
    /// Cookie behavior override.
    pub credentials: Option<Credentials>,
    /// Cross-origin behavior override.
    pub mode: Option<Mode>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Timeout error message override.
    pub timeout_error_message: Option<String>,
    /// Timeout error status override.
    pub timeout_error_status: Option<u16>,
    /// Fingerprint cache retention policy.
    pub cache: Option<CachePolicy>,
    /// Persistent cache tier for this request.
    pub cache_store: Option<Arc<dyn CacheStore>>,
    /// Status codes treated as an empty success instead of an error.
    pub ignore: Vec<u16>,
    /// Encode the body as multipart form data.
    pub is_file: bool,
    /// Multipart parts sent alongside `data` fields when `is_file` is set.
    pub files: Vec<FormPart>,
    /// Resolve with the raw response instead of a parsed body.
    pub use_origin: bool,
    /// Percent-encode query components folded into the URL.
    pub encode_url: bool,
    /// Exclude this call from `abort_all`.
    pub exclude_from_abort_all: bool,
    /// External header source for trace propagation.
    pub origin_headers: Option<BTreeMap<String, String>>,
    /// Injected-header allow-list override.
    pub inject_header_keys: Option<Vec<String>>,
    /// Default content type override.
    pub default_content_type: Option<String>,
    /// Externally supplied cancellation signal. When set, no internal abort
    /// controller is created and `abort_all` cannot reach this call.
    pub signal: Option<AbortRegistration>,
}

impl RequestConfig {
    /// Set a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("authorization", format!("Bearer {}", token.into()))
    }

    /// Set basic authentication.
    pub fn basic_auth(
        self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.into(), p.into()),
            None => format!("{}:", username.into()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("authorization", format!("Basic {}", encoded))
    }

    /// Set the body to URL-encoded form data.
    pub fn form<T: Serialize>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => {
                self.headers.insert(
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                );
                self.data = Some(Value::String(encoded));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode form data");
            }
        }
        self
    }
}

/// A request configuration with all defaults applied.
///
/// Invariant: every field the transport needs (method, url, credentials,
/// mode) is present after the merge.
#[derive(Clone)]
pub struct MergedConfig {
    pub url: String,
    pub base_url: Option<String>,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub data: Option<Value>,
    pub query: Option<Value>,
    pub credentials: Credentials,
    pub mode: Mode,
    pub timeout: Duration,
    pub timeout_error_message: String,
    pub timeout_error_status: u16,
    pub cache: CachePolicy,
    pub cache_store: Option<Arc<dyn CacheStore>>,
    pub ignore: Vec<u16>,
    pub is_file: bool,
    pub files: Vec<FormPart>,
    pub use_origin: bool,
    pub encode_url: bool,
    pub exclude_from_abort_all: bool,
    pub origin_headers: Option<BTreeMap<String, String>>,
    pub inject_header_keys: Vec<String>,
    pub default_content_type: String,
}

impl fmt::Debug for MergedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedConfig")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .field("has_store", &self.cache_store.is_some())
            .finish_non_exhaustive()
    }
}

impl MergedConfig {
    /// Overlay a partial request configuration onto the client defaults.
    /// Absent (`None`) fields fall back; present fields win.
    pub(crate) fn overlay(cfg: RequestConfig, defaults: &ClientConfig) -> Result<Self> {
        let url = cfg
            .url
            .ok_or_else(|| ClientError::InvalidUrl("request url missing".to_string()))?;

        let mut headers = defaults.default_headers.clone();
        headers.extend(cfg.headers);

        Ok(Self {
            url,
            base_url: cfg.base_url.or_else(|| defaults.base_url.clone()),
            method: cfg.method.unwrap_or_else(|| defaults.method.clone()),
            headers,
            data: cfg.data,
            query: cfg.query,
            credentials: cfg.credentials.unwrap_or(defaults.credentials),
            mode: cfg.mode.unwrap_or(defaults.mode),
            timeout: cfg.timeout.unwrap_or(defaults.timeout),
            timeout_error_message: cfg
                .timeout_error_message
                .unwrap_or_else(|| defaults.timeout_error_message.clone()),
            timeout_error_status: cfg
                .timeout_error_status
                .unwrap_or(defaults.timeout_error_status),
            cache: cfg.cache.unwrap_or(CachePolicy::UntilSettled),
            cache_store: cfg.cache_store,
            ignore: cfg.ignore,
            is_file: cfg.is_file,
            files: cfg.files,
            use_origin: cfg.use_origin,
            encode_url: cfg.encode_url,
            exclude_from_abort_all: cfg.exclude_from_abort_all,
            origin_headers: cfg.origin_headers,
            inject_header_keys: cfg
                .inject_header_keys
                .unwrap_or_else(|| defaults.inject_header_keys.clone()),
            default_content_type: cfg
                .default_content_type
                .unwrap_or_else(|| defaults.default_content_type.clone()),
        })
    }
}
