//! The orchestrating HTTP client.

use crate::abort::{AbortController, AbortableCall};
use crate::config::{CachePolicy, ClientConfig, MergedConfig, RequestConfig};
use crate::dedupe::{fingerprint, InFlightEntry, InFlightMap, Settled, SharedSettlement, Source};
use crate::error::{ClientError, Result};
use crate::interceptor::Interceptors;
use crate::response::Payload;
use crate::timeout;
use crate::transport::{dispatch, ReqwestTransport, Transport};
use futures::future::{AbortRegistration, Abortable};
use futures::FutureExt;
use http::Method;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;

/// HTTP client orchestrating interceptors, de-duplication, caching, and
/// timeout-bounded cancellation over a pluggable transport.
///
/// Cloning is cheap; clones share defaults, interceptors, and the
/// fingerprint map.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    defaults: RwLock<ClientConfig>,
    interceptors: Arc<Interceptors>,
    in_flight: Arc<InFlightMap>,
}

impl HttpClient {
    /// Create a client over the default reqwest-backed transport.
    pub fn new(defaults: ClientConfig) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()), defaults)
    }

    /// Create a client over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>, defaults: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                defaults: RwLock::new(defaults),
                interceptors: Arc::new(Interceptors::default()),
                in_flight: Arc::new(InFlightMap::default()),
            }),
        }
    }

    /// The request and response interceptor chains.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Snapshot of the current defaults.
    pub fn defaults(&self) -> ClientConfig {
        self.inner.defaults.read().clone()
    }

    /// Mutate the process-wide defaults in place.
    pub fn update_defaults(&self, update: impl FnOnce(&mut ClientConfig)) {
        update(&mut self.inner.defaults.write());
    }

    /// Number of tracked in-flight (or retained) entries.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Drop every retained entry whose window has passed. Entries are also
    /// evicted lazily on access; this is the explicit tick.
    pub fn evict_expired(&self) {
        self.inner.in_flight.evict_expired();
    }

    /// Cancel one controller. Equivalent to `controller.abort()`.
    pub fn abort(&self, controller: &AbortController) {
        controller.abort();
    }

    /// Cancel every tracked call that has not opted out via
    /// `exclude_from_abort_all`.
    pub fn abort_all(&self) {
        self.inner.in_flight.abort_all();
    }

    /// Remove the entry for this configuration from both cache tiers.
    pub async fn clear_cache_by_config(&self, config: RequestConfig) -> Result<()> {
        let (merged, _signal) = self.merge(config)?;
        let key = fingerprint(&merged);
        if let Some(store) = &merged.cache_store {
            store.delete(&key).await?;
        }
        self.inner.in_flight.remove(&key);
        Ok(())
    }

    /// Perform a request and settle with its payload.
    pub async fn request(&self, config: RequestConfig) -> Result<Payload> {
        Ok(self.request_outcome(config).await?.payload)
    }

    /// Perform a request and settle with the payload plus its provenance
    /// (network, memory tier, or store tier).
    pub async fn request_outcome(&self, config: RequestConfig) -> Result<Settled> {
        let (settlement, _controller, hit) = self.launch(config)?;
        let mut settled = settlement.await?;
        if hit {
            settled.source = Source::MemoryCache;
        }
        Ok(settled)
    }

    /// Perform a request and decode the payload into `T`.
    pub async fn request_decoded<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T> {
        self.request(config).await?.decode()
    }

    /// GET request.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::GET, url.into(), data, options))
            .await
    }

    /// POST request.
    pub async fn post<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::POST, url.into(), data, options))
            .await
    }

    /// PUT request.
    pub async fn put<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::PUT, url.into(), data, options))
            .await
    }

    /// DELETE request.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::DELETE, url.into(), data, options))
            .await
    }

    /// PATCH request.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::PATCH, url.into(), data, options))
            .await
    }

    /// HEAD request.
    pub async fn head<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        options: Option<RequestConfig>,
    ) -> Result<T> {
        self.request_decoded(verb_config(Method::HEAD, url.into(), None, options))
            .await
    }

    /// Perform a request and hand back the means to cancel it.
    pub fn request_abort_result<T>(&self, config: RequestConfig) -> AbortableCall<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.launch(config) {
            Ok((settlement, controller, _hit)) => {
                let future = async move {
                    let settled = settlement.await?;
                    settled.payload.decode::<T>()
                }
                .boxed();
                AbortableCall::new(future, controller)
            }
            Err(err) => AbortableCall::new(async move { Err(err) }.boxed(), None),
        }
    }

    /// GET request with an abort handle.
    pub fn get_abort_result<T>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> AbortableCall<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request_abort_result(verb_config(Method::GET, url.into(), data, options))
    }

    /// POST request with an abort handle.
    pub fn post_abort_result<T>(
        &self,
        url: impl Into<String>,
        data: Option<Value>,
        options: Option<RequestConfig>,
    ) -> AbortableCall<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.request_abort_result(verb_config(Method::POST, url.into(), data, options))
    }

    /// Merge a partial configuration against the defaults and run the
    /// request interceptor chain.
    fn merge(&self, mut config: RequestConfig) -> Result<(MergedConfig, Option<AbortRegistration>)> {
        let signal = config.signal.take();
        let defaults = self.inner.defaults.read().clone();
        let merged = MergedConfig::overlay(config, &defaults)?;
        let merged = self.inner.interceptors.request().apply(merged)?;
        Ok((merged, signal))
    }

    /// Synchronous half of a request: merge, fingerprint, and either join
    /// the existing entry or insert a fresh one. No suspension happens
    /// before the map decision, which is what keeps concurrent identical
    /// requests down to one transport call.
    fn launch(
        &self,
        config: RequestConfig,
    ) -> Result<(SharedSettlement, Option<AbortController>, bool)> {
        let (merged, signal) = self.merge(config)?;

        let interceptors = self.inner.interceptors.clone();
        let transport = self.inner.transport.clone();

        if matches!(merged.cache, CachePolicy::Bypass) {
            // Fresh call, untracked: never deduplicated, unreachable for
            // abort_all.
            let (controller, registration) = resolve_controller(signal);
            let core_controller = controller.clone();
            let settlement: SharedSettlement = async move {
                let payload =
                    run_core(interceptors, transport, merged, registration, core_controller)
                        .await?;
                Ok(Settled {
                    payload,
                    source: Source::Network,
                })
            }
            .boxed()
            .shared();
            return Ok((settlement, controller, false));
        }

        let key = fingerprint(&merged);
        let exclude_from_abort_all = merged.exclude_from_abort_all;
        let weak_map = Arc::downgrade(&self.inner.in_flight);
        let entry_key = key.clone();

        let (settlement, controller, hit) =
            self.inner.in_flight.get_or_insert_with(&key, move || {
                let (controller, registration) = resolve_controller(signal);
                let settlement = make_settlement(
                    interceptors,
                    transport,
                    weak_map,
                    merged,
                    registration,
                    controller.clone(),
                    entry_key,
                );
                InFlightEntry {
                    settlement,
                    controller,
                    exclude_from_abort_all,
                    expires_at: None,
                }
            });

        if hit {
            tracing::debug!(key = %key, "read from in-flight cache");
        }
        Ok((settlement, controller, hit))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

/// Build the per-verb request configuration. Fields already present in the
/// caller's options win, mirroring option-spread semantics.
fn verb_config(
    method: Method,
    url: String,
    data: Option<Value>,
    options: Option<RequestConfig>,
) -> RequestConfig {
    let mut config = options.unwrap_or_default();
    if config.url.is_none() {
        config.url = Some(url);
    }
    if config.method.is_none() {
        config.method = Some(method);
    }
    if config.data.is_none() {
        config.data = data;
    }
    config
}

fn resolve_controller(
    signal: Option<AbortRegistration>,
) -> (Option<AbortController>, AbortRegistration) {
    match signal {
        Some(registration) => (None, registration),
        None => {
            let (controller, registration) = AbortController::new();
            (Some(controller), registration)
        }
    }
}

/// One transport invocation: abortable dispatch, raced against the timeout,
/// threaded through the response interceptor chain.
async fn run_core(
    interceptors: Arc<Interceptors>,
    transport: Arc<dyn Transport>,
    merged: MergedConfig,
    registration: AbortRegistration,
    controller: Option<AbortController>,
) -> Result<Payload> {
    let duration = merged.timeout;
    let status = merged.timeout_error_status;
    let message = merged.timeout_error_message.clone();

    let call = Abortable::new(
        async move { dispatch(transport.as_ref(), &merged).await },
        registration,
    );
    let raced = timeout::race(call, duration, controller.as_ref(), status, &message).await;

    interceptors.response().apply(raced).await
}

/// Build the shared settlement for a tracked entry, including the cache
/// bookkeeping that runs exactly once when it settles.
fn make_settlement(
    interceptors: Arc<Interceptors>,
    transport: Arc<dyn Transport>,
    in_flight: Weak<InFlightMap>,
    merged: MergedConfig,
    registration: AbortRegistration,
    controller: Option<AbortController>,
    key: String,
) -> SharedSettlement {
    async move {
        match merged.cache_store.clone() {
            Some(store) => {
                settle_with_store(
                    interceptors,
                    transport,
                    in_flight,
                    merged,
                    registration,
                    controller,
                    key,
                    store,
                )
                .await
            }
            None => {
                let policy = merged.cache;
                let outcome =
                    run_core(interceptors, transport, merged, registration, controller).await;
                match &outcome {
                    Ok(_) => match policy {
                        CachePolicy::Retain(retention) => {
                            set_entry_expiry(&in_flight, &key, retention);
                        }
                        CachePolicy::Forever => {}
                        _ => remove_entry(&in_flight, &key),
                    },
                    // Errors are never cached.
                    Err(_) => remove_entry(&in_flight, &key),
                }
                outcome.map(|payload| Settled {
                    payload,
                    source: Source::Network,
                })
            }
        }
    }
    .boxed()
    .shared()
}

/// Store-tier settlement: read through, fall back to the transport, write
/// back on success. The store owns retention, so the in-memory entry is
/// dropped as soon as the outcome is durable.
#[allow(clippy::too_many_arguments)]
async fn settle_with_store(
    interceptors: Arc<Interceptors>,
    transport: Arc<dyn Transport>,
    in_flight: Weak<InFlightMap>,
    merged: MergedConfig,
    registration: AbortRegistration,
    controller: Option<AbortController>,
    key: String,
    store: Arc<dyn courier_cache::CacheStore>,
) -> Result<Settled> {
    match store.get(&key).await {
        Ok(Some(raw)) => {
            if let Some(payload) = Payload::from_store_value(&raw) {
                tracing::debug!(key = %key, "read from cache store");
                remove_entry(&in_flight, &key);
                return Ok(Settled {
                    payload,
                    source: Source::StoreCache,
                });
            }
            tracing::warn!(key = %key, "unreadable cache store entry, refetching");
        }
        Ok(None) => {}
        Err(err) => {
            remove_entry(&in_flight, &key);
            return Err(ClientError::Cache(err));
        }
    }

    let retention = match merged.cache {
        CachePolicy::Retain(duration) => Some(duration),
        _ => None,
    };

    match run_core(interceptors, transport, merged, registration, controller).await {
        Ok(payload) => {
            match payload.to_store_value() {
                Some(value) => {
                    // Write failures degrade to "no persistent caching",
                    // never to request failure.
                    if let Err(err) = store.set(&key, value, retention).await {
                        tracing::error!(key = %key, error = %err, "cache store set failed");
                    }
                }
                None => {
                    tracing::debug!(key = %key, "raw payload skipped for cache store");
                }
            }
            remove_entry(&in_flight, &key);
            Ok(Settled {
                payload,
                source: Source::Network,
            })
        }
        Err(err) => {
            remove_entry(&in_flight, &key);
            Err(err)
        }
    }
}

fn remove_entry(map: &Weak<InFlightMap>, key: &str) {
    if let Some(map) = map.upgrade() {
        map.remove(key);
    }
}

fn set_entry_expiry(map: &Weak<InFlightMap>, key: &str, retention: Duration) {
    if let Some(map) = map.upgrade() {
        map.set_expiry(key, Instant::now() + retention);
    }
}
