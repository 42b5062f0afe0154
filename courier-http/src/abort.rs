//! Cancellation controllers for in-flight requests.

use crate::error::Result;
use futures::future::{AbortHandle, AbortRegistration, BoxFuture};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Handle that cancels the transport call it was created for.
///
/// Aborting a deduplicated call rejects every caller sharing its
/// settlement, since they all wait on the same future.
#[derive(Debug, Clone)]
pub struct AbortController {
    handle: AbortHandle,
}

impl AbortController {
    /// Create a controller and the registration its transport call is
    /// wrapped with.
    pub fn new() -> (Self, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        (Self { handle }, registration)
    }

    /// Cancel the associated transport call.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether `abort` has been called.
    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }
}

/// A launched request together with the controller that cancels it.
///
/// Awaiting the call yields the decoded result; [`abort`](Self::abort)
/// rejects it with [`ClientError::Aborted`](crate::ClientError::Aborted).
pub struct AbortableCall<T> {
    future: BoxFuture<'static, Result<T>>,
    controller: Option<AbortController>,
}

impl<T> AbortableCall<T> {
    pub(crate) fn new(
        future: BoxFuture<'static, Result<T>>,
        controller: Option<AbortController>,
    ) -> Self {
        Self { future, controller }
    }

    /// Cancel the call. No-op when the caller supplied an external signal.
    pub fn abort(&self) {
        if let Some(controller) = &self.controller {
            controller.abort();
        }
    }

    /// The controller backing this call, when one was created internally.
    pub fn controller(&self) -> Option<&AbortController> {
        self.controller.as_ref()
    }
}

impl<T> Future for AbortableCall<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::Abortable;

    #[tokio::test]
    async fn test_abort_cancels_wrapped_future() {
        let (controller, registration) = AbortController::new();
        let wrapped = Abortable::new(std::future::pending::<()>(), registration);

        controller.abort();
        assert!(controller.is_aborted());
        assert!(wrapped.await.is_err());
    }

    #[tokio::test]
    async fn test_abortable_call_resolves() {
        let call: AbortableCall<u8> =
            AbortableCall::new(Box::pin(std::future::ready(Ok(7))), None);
        assert_eq!(call.await.unwrap(), 7);
    }
}
