//! Request and response interceptor chains.
//!
//! Interceptors register as (fulfillment, rejection) handler pairs and run
//! in registration order. Request handlers transform the merged
//! configuration before the fingerprint is computed; response handlers
//! transform the settled outcome, and may recover a failure into a success
//! or fail a success.

use crate::config::MergedConfig;
use crate::error::{ClientError, Result};
use crate::response::Payload;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

type RequestHandler = Arc<dyn Fn(MergedConfig) -> Result<MergedConfig> + Send + Sync>;
type RequestRejectionHandler = Arc<dyn Fn(&ClientError) + Send + Sync>;

type ResponseHandler = Arc<dyn Fn(Payload) -> BoxFuture<'static, Result<Payload>> + Send + Sync>;
type ResponseRejectionHandler =
    Arc<dyn Fn(ClientError) -> BoxFuture<'static, Result<Payload>> + Send + Sync>;

/// Ordered chain of request interceptors.
///
/// Ejected slots are tombstoned so registration indices handed out earlier
/// stay valid.
#[derive(Default)]
pub struct RequestInterceptors {
    chain: Mutex<Vec<Option<(RequestHandler, Option<RequestRejectionHandler>)>>>,
}

impl RequestInterceptors {
    /// Register a handler. Returns its registration index for `eject`.
    pub fn add<F>(&self, on_fulfilled: F) -> usize
    where
        F: Fn(MergedConfig) -> Result<MergedConfig> + Send + Sync + 'static,
    {
        self.push(Arc::new(on_fulfilled), None)
    }

    /// Register a handler with a paired rejection handler. The rejection
    /// handler observes the error that aborted the chain.
    pub fn add_with_rejection<F, G>(&self, on_fulfilled: F, on_rejected: G) -> usize
    where
        F: Fn(MergedConfig) -> Result<MergedConfig> + Send + Sync + 'static,
        G: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.push(Arc::new(on_fulfilled), Some(Arc::new(on_rejected)))
    }

    /// Remove the handler registered under `index`.
    pub fn eject(&self, index: usize) {
        let mut chain = self.chain.lock();
        if let Some(slot) = chain.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of live handlers.
    pub fn len(&self) -> usize {
        self.chain.lock().iter().flatten().count()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(
        &self,
        on_fulfilled: RequestHandler,
        on_rejected: Option<RequestRejectionHandler>,
    ) -> usize {
        let mut chain = self.chain.lock();
        chain.push(Some((on_fulfilled, on_rejected)));
        chain.len() - 1
    }

    /// Run the chain over a merged configuration. A handler error invokes
    /// the paired rejection handler, aborts the chain, and fails the merge.
    pub(crate) fn apply(&self, mut config: MergedConfig) -> Result<MergedConfig> {
        let chain: Vec<_> = self.chain.lock().iter().flatten().cloned().collect();
        for (on_fulfilled, on_rejected) in chain {
            match on_fulfilled(config) {
                Ok(next) => config = next,
                Err(err) => {
                    tracing::error!(error = %err, "request interceptor failed");
                    if let Some(on_rejected) = on_rejected {
                        on_rejected(&err);
                    }
                    return Err(err);
                }
            }
        }
        Ok(config)
    }
}

/// Ordered chain of response interceptors.
#[derive(Default)]
pub struct ResponseInterceptors {
    chain: Mutex<Vec<Option<(Option<ResponseHandler>, Option<ResponseRejectionHandler>)>>>,
}

impl ResponseInterceptors {
    /// Register a fulfillment handler. Returns its registration index.
    pub fn add<F, Fut>(&self, on_fulfilled: F) -> usize
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.push(Some(box_handler(on_fulfilled)), None)
    }

    /// Register a fulfillment handler with a paired rejection handler.
    pub fn add_with_recovery<F, Fut, G, GFut>(&self, on_fulfilled: F, on_rejected: G) -> usize
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
        G: Fn(ClientError) -> GFut + Send + Sync + 'static,
        GFut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.push(Some(box_handler(on_fulfilled)), Some(box_rejection(on_rejected)))
    }

    /// Register a rejection-only handler; fulfilled outcomes pass through.
    pub fn add_recovery<G, GFut>(&self, on_rejected: G) -> usize
    where
        G: Fn(ClientError) -> GFut + Send + Sync + 'static,
        GFut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.push(None, Some(box_rejection(on_rejected)))
    }

    /// Remove the handler pair registered under `index`.
    pub fn eject(&self, index: usize) {
        let mut chain = self.chain.lock();
        if let Some(slot) = chain.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of live handler pairs.
    pub fn len(&self) -> usize {
        self.chain.lock().iter().flatten().count()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(
        &self,
        on_fulfilled: Option<ResponseHandler>,
        on_rejected: Option<ResponseRejectionHandler>,
    ) -> usize {
        let mut chain = self.chain.lock();
        chain.push(Some((on_fulfilled, on_rejected)));
        chain.len() - 1
    }

    /// Thread the settled outcome through the chain. Each stage sees the
    /// state left by the previous one; a missing handler passes the state
    /// through unchanged.
    pub(crate) async fn apply(&self, mut state: Result<Payload>) -> Result<Payload> {
        let chain: Vec<_> = self.chain.lock().iter().flatten().cloned().collect();
        for (on_fulfilled, on_rejected) in chain {
            state = match state {
                Ok(payload) => match on_fulfilled {
                    Some(handler) => handler(payload).await,
                    None => Ok(payload),
                },
                Err(err) => match on_rejected {
                    Some(handler) => handler(err).await,
                    None => Err(err),
                },
            };
        }
        state
    }
}

fn box_handler<F, Fut>(f: F) -> ResponseHandler
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    Arc::new(move |payload| f(payload).boxed())
}

fn box_rejection<G, GFut>(g: G) -> ResponseRejectionHandler
where
    G: Fn(ClientError) -> GFut + Send + Sync + 'static,
    GFut: Future<Output = Result<Payload>> + Send + 'static,
{
    Arc::new(move |err| g(err).boxed())
}

/// The request and response chains of one client.
#[derive(Default)]
pub struct Interceptors {
    request: RequestInterceptors,
    response: ResponseInterceptors,
}

impl Interceptors {
    /// The request chain, run during the merge phase.
    pub fn request(&self) -> &RequestInterceptors {
        &self.request
    }

    /// The response chain, run over the settled outcome.
    pub fn response(&self) -> &ResponseInterceptors {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, RequestConfig};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn merged(url: &str) -> MergedConfig {
        MergedConfig::overlay(
            RequestConfig {
                url: Some(url.to_string()),
                ..Default::default()
            },
            &ClientConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_request_chain_runs_in_order() {
        let interceptors = RequestInterceptors::default();
        interceptors.add(|mut config| {
            config.headers.insert("x-order".to_string(), "first".to_string());
            Ok(config)
        });
        interceptors.add(|mut config| {
            let previous = config.headers.get("x-order").cloned().unwrap_or_default();
            config
                .headers
                .insert("x-order".to_string(), format!("{previous},second"));
            Ok(config)
        });

        let config = interceptors.apply(merged("/api")).unwrap();
        assert_eq!(
            config.headers.get("x-order").map(String::as_str),
            Some("first,second")
        );
    }

    #[test]
    fn test_request_chain_error_aborts_merge() {
        let rejected = Arc::new(AtomicBool::new(false));
        let observed = rejected.clone();

        let interceptors = RequestInterceptors::default();
        interceptors.add_with_rejection(
            |_config| Err(ClientError::Interceptor("nope".to_string())),
            move |err| {
                assert!(matches!(err, ClientError::Interceptor(_)));
                observed.store(true, Ordering::SeqCst);
            },
        );
        interceptors.add(|mut config| {
            config.headers.insert("x-later".to_string(), "ran".to_string());
            Ok(config)
        });

        let err = interceptors.apply(merged("/api")).unwrap_err();
        assert!(matches!(err, ClientError::Interceptor(_)));
        assert!(rejected.load(Ordering::SeqCst));
    }

    #[test]
    fn test_eject_keeps_indices_stable() {
        let interceptors = RequestInterceptors::default();
        let first = interceptors.add(|mut config| {
            config.headers.insert("x-a".to_string(), "1".to_string());
            Ok(config)
        });
        let second = interceptors.add(|mut config| {
            config.headers.insert("x-b".to_string(), "2".to_string());
            Ok(config)
        });

        interceptors.eject(first);
        assert_eq!(interceptors.len(), 1);

        let config = interceptors.apply(merged("/api")).unwrap();
        assert!(!config.headers.contains_key("x-a"));
        assert!(config.headers.contains_key("x-b"));

        // The second handler's index still refers to the second handler.
        interceptors.eject(second);
        assert!(interceptors.is_empty());
    }

    #[tokio::test]
    async fn test_response_chain_transforms_success() {
        let interceptors = ResponseInterceptors::default();
        interceptors.add(|payload| async move {
            match payload {
                Payload::Json(value) => Ok(Payload::Json(json!({ "wrapped": value }))),
                other => Ok(other),
            }
        });

        let out = interceptors.apply(Ok(Payload::Json(json!(1)))).await.unwrap();
        assert_eq!(out, Payload::Json(json!({ "wrapped": 1 })));
    }

    #[tokio::test]
    async fn test_response_chain_recovers_failure() {
        let interceptors = ResponseInterceptors::default();
        interceptors.add_recovery(|err| async move {
            assert!(matches!(err, ClientError::Status { .. }));
            Ok(Payload::Json(json!({ "recovered": true })))
        });

        let out = interceptors
            .apply(Err(ClientError::Status {
                status: 500,
                message: "boom".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(out, Payload::Json(json!({ "recovered": true })));
    }

    #[tokio::test]
    async fn test_response_chain_passthrough_without_handler() {
        let interceptors = ResponseInterceptors::default();
        interceptors.add(|payload| async move { Ok(payload) });

        let err = interceptors
            .apply(Err(ClientError::Aborted))
            .await
            .unwrap_err();
        assert!(err.is_aborted());
    }
}
