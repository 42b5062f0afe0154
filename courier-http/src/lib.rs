//! # Courier HTTP
//!
//! An HTTP request orchestration layer over a pluggable fetch-like
//! transport: request/response interceptor pipelines, per-fingerprint
//! de-duplication with optional persistent caching, timeout-bounded
//! cancellation, and a uniform error taxonomy.
//!
//! ## Features
//!
//! - **De-duplication**: concurrent identical requests share one transport
//!   call and one settlement
//! - **Two cache tiers**: the in-process fingerprint map for request
//!   storms, an optional [`CacheStore`] for durable results
//! - **Interceptors**: ordered request/response transformation with
//!   paired rejection handlers
//! - **Timeouts**: per-request racing with configurable status and message
//! - **Cancellation**: per-call abort controllers, bulk `abort_all`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_http::HttpClient;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::default();
//!
//!     let user: Value = client
//!         .get("https://api.example.com/users/1", None, None)
//!         .await?;
//!
//!     println!("{user}");
//!     Ok(())
//! }
//! ```
//!
//! ## With interceptors and caching
//!
//! ```rust,no_run
//! use courier_http::{CachePolicy, HttpClient, RequestConfig};
//! use courier_cache::InMemoryCache;
//! use serde_json::Value;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::default();
//!
//!     client.interceptors().request().add(|mut config| {
//!         config.headers.insert("x-app".into(), "courier".into());
//!         Ok(config)
//!     });
//!
//!     let options = RequestConfig {
//!         cache: Some(CachePolicy::Retain(Duration::from_secs(30))),
//!         cache_store: Some(Arc::new(InMemoryCache::new())),
//!         ..Default::default()
//!     };
//!     let value: Value = client
//!         .get("https://api.example.com/feed", None, Some(options))
//!         .await?;
//!
//!     println!("{value}");
//!     Ok(())
//! }
//! ```

mod abort;
mod client;
mod config;
mod dedupe;
mod error;
mod interceptor;
mod response;
mod timeout;
mod transport;

pub use abort::{AbortController, AbortableCall};
pub use client::HttpClient;
pub use config::{
    CachePolicy, ClientConfig, ClientConfigBuilder, Credentials, MergedConfig, Mode, RequestConfig,
};
pub use dedupe::{Settled, Source};
pub use error::{BoxError, ClientError, Result};
pub use interceptor::{Interceptors, RequestInterceptors, ResponseInterceptors};
pub use response::{Payload, Response};
pub use transport::{
    FormPart, FormValue, ReqwestTransport, Transport, TransportBody, TransportRequest,
};

// Re-export common types
pub use bytes::Bytes;
pub use courier_cache::{CacheError, CacheStore, InMemoryCache};
pub use futures::future::{AbortHandle, AbortRegistration};
pub use http::{header, HeaderMap, HeaderValue, Method, StatusCode};

/// Prelude for common imports.
///
/// ```
/// use courier_http::prelude::*;
/// ```
pub mod prelude {
    pub use crate::abort::{AbortController, AbortableCall};
    pub use crate::client::HttpClient;
    pub use crate::config::{
        CachePolicy, ClientConfig, ClientConfigBuilder, Credentials, Mode, RequestConfig,
    };
    pub use crate::dedupe::{Settled, Source};
    pub use crate::error::{ClientError, Result};
    pub use crate::response::{Payload, Response};
    pub use crate::transport::{ReqwestTransport, Transport, TransportRequest};
    pub use courier_cache::{CacheStore, InMemoryCache};
    pub use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
}
