//! Transport primitive and the adapter that drives it.
//!
//! The orchestration layer talks to the network through the [`Transport`]
//! trait: given a fully built request, asynchronously yield a response
//! snapshot or fail. [`ReqwestTransport`] is the bundled implementation;
//! tests and embedders substitute their own.

use crate::config::{Credentials, MergedConfig, Mode};
use crate::error::{BoxError, ClientError, Result};
use crate::response::{Payload, Response};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;

/// A request as handed to the transport: final URL, final headers, encoded
/// body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Fully assembled URL, query included.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Final header set (lowercase keys).
    pub headers: BTreeMap<String, String>,
    /// Encoded body, absent for GET.
    pub body: Option<TransportBody>,
    /// Cookie behavior hint; server-side transports may ignore it.
    pub credentials: Credentials,
    /// Cross-origin behavior hint; server-side transports may ignore it.
    pub mode: Mode,
}

/// Request body handed to the transport.
#[derive(Debug, Clone)]
pub enum TransportBody {
    /// Pre-encoded bytes; content type already set in the headers.
    Bytes(Bytes),
    /// Multipart form parts; the transport owns boundary encoding.
    Multipart(Vec<FormPart>),
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

/// Value of a multipart form part.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// File field.
    File {
        /// File name reported to the server.
        filename: String,
        /// Optional content type of the file.
        content_type: Option<String>,
        /// File contents.
        data: Bytes,
    },
}

/// The network-fetch primitive.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. Failures (connection, DNS, TLS) surface as
    /// errors; any response, whatever its status, is a success here.
    async fn send(&self, request: TransportRequest) -> std::result::Result<Response, BoxError>;
}

/// Default transport backed by reqwest.
///
/// Timeouts are owned by the orchestration layer's racer, so the inner
/// client is built without one.
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default reqwest client.
    pub fn new() -> Self {
        let inner = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self { inner }
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> std::result::Result<Response, BoxError> {
        // credentials/mode are browser-fetch hints with no server-side analog.
        let mut builder = self.inner.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match request.body {
            Some(TransportBody::Bytes(bytes)) => {
                builder = builder.body(bytes);
            }
            Some(TransportBody::Multipart(parts)) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    form = match part.value {
                        FormValue::Text(text) => form.text(part.name, text),
                        FormValue::File {
                            filename,
                            content_type,
                            data,
                        } => {
                            let mut piece =
                                reqwest::multipart::Part::bytes(data.to_vec()).file_name(filename);
                            if let Some(content_type) = content_type {
                                piece = piece.mime_str(&content_type)?;
                            }
                            form.part(part.name, piece)
                        }
                    };
                }
                builder = builder.multipart(form);
            }
            None => {}
        }

        let response = builder.send().await?;
        Ok(Response::from_reqwest(response).await)
    }
}

/// Build the final transport request from a merged configuration.
pub(crate) fn build_request(config: &MergedConfig) -> Result<TransportRequest> {
    let mut url = join_base_url(&config.url, config.base_url.as_deref());
    let mut headers = config.headers.clone();
    let mut body = None;

    if config.method == Method::GET {
        // GET requests never carry a body; data becomes the query string.
        if let Some(data) = &config.data {
            url = append_query(&url, data, config.encode_url);
        }
    } else {
        if let Some(query) = &config.query {
            url = append_query(&url, query, config.encode_url);
        }
        body = build_body(config, &mut headers)?;
    }

    inject_origin_headers(&mut headers, config);

    Ok(TransportRequest {
        url,
        method: config.method.clone(),
        headers,
        body,
        credentials: config.credentials,
        mode: config.mode,
    })
}

/// Dispatch one request and classify the outcome.
pub(crate) async fn dispatch(transport: &dyn Transport, config: &MergedConfig) -> Result<Payload> {
    let request = build_request(config)?;
    tracing::debug!(method = %request.method, url = %request.url, "sending request");

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => return Err(ClientError::network(err)),
    };

    classify_response(response, config)
}

/// Turn a transport response into the settled payload or error.
pub(crate) fn classify_response(response: Response, config: &MergedConfig) -> Result<Payload> {
    if !response.ok() {
        let status = response.status().as_u16();
        if !config.ignore.contains(&status) {
            let text = response.text();
            let message = if text.is_empty() {
                response.status_text().to_string()
            } else {
                text
            };
            tracing::error!(status, status_text = response.status_text(), "HTTP error response");
            return Err(ClientError::Status { status, message });
        }
        // Ignored status: an empty success, unless the caller asked for the
        // raw response, which is rejected through untouched.
        if config.use_origin {
            return Err(ClientError::RawResponse { response });
        }
        return Ok(Payload::Empty);
    }

    if config.use_origin {
        return Ok(Payload::Raw(response));
    }

    Ok(Payload::from_body(response.text()))
}

fn join_base_url(url: &str, base_url: Option<&str>) -> String {
    if url.starts_with("http") {
        return url.to_string();
    }
    match base_url {
        Some(base) => {
            let base = base.strip_suffix('/').unwrap_or(base);
            let path = url.strip_prefix('/').unwrap_or(url);
            format!("{base}/{path}")
        }
        None => url.to_string(),
    }
}

/// Fold `params` into the URL's query string. Objects become `k=v` pairs;
/// anything else is appended verbatim.
fn append_query(url: &str, params: &Value, encode: bool) -> String {
    let query = match params {
        Value::Object(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(key, value)| {
                    if encode {
                        format!(
                            "{}={}",
                            encode_component(key),
                            encode_component(&query_value(value))
                        )
                    } else {
                        format!("{key}={}", query_value(value))
                    }
                })
                .collect();
            pairs.join("&")
        }
        other => {
            let raw = query_value(other);
            if encode {
                encode_component(&raw)
            } else {
                raw
            }
        }
    };

    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Render a JSON value for a query string: strings unquoted, everything
/// else in JSON form.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_component(component: &str) -> String {
    url::form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

fn build_body(
    config: &MergedConfig,
    headers: &mut BTreeMap<String, String>,
) -> Result<Option<TransportBody>> {
    if config.is_file {
        let mut parts = Vec::new();
        if let Some(Value::Object(map)) = &config.data {
            for (key, value) in map {
                parts.push(FormPart {
                    name: key.clone(),
                    value: FormValue::Text(query_value(value)),
                });
            }
        }
        parts.extend(config.files.iter().cloned());
        return Ok(Some(TransportBody::Multipart(parts)));
    }

    let Some(data) = &config.data else {
        return Ok(None);
    };

    let bytes = match data {
        // String data is passed through as-is (pre-encoded bodies).
        Value::String(s) => Bytes::from(s.clone().into_bytes()),
        other => Bytes::from(
            serde_json::to_vec(other).map_err(|e| ClientError::Json(e.to_string()))?,
        ),
    };

    if (config.method == Method::POST || config.method == Method::PUT)
        && !headers.keys().any(|key| key.eq_ignore_ascii_case("content-type"))
    {
        headers.insert("content-type".to_string(), config.default_content_type.clone());
    }

    Ok(Some(TransportBody::Bytes(bytes)))
}

fn inject_origin_headers(headers: &mut BTreeMap<String, String>, config: &MergedConfig) {
    let Some(origin) = &config.origin_headers else {
        return;
    };
    for key in &config.inject_header_keys {
        if let Some(value) = origin.get(key) {
            headers.insert(key.clone(), value.clone());
        }
    }
}
