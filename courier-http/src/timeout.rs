//! Timeout racing over in-flight transport calls.

use crate::abort::AbortController;
use crate::error::{ClientError, Result};
use futures::future::Aborted;
use std::future::Future;
use std::time::Duration;

/// Race an abortable transport call against a timer.
///
/// Timer expiry aborts the controller (when one exists) and rejects with
/// the configured timeout status and message; the transport future is
/// dropped, so neither branch can fire after settlement.
pub(crate) async fn race<T, F>(
    transport_call: F,
    duration: Duration,
    controller: Option<&AbortController>,
    status: u16,
    message: &str,
) -> Result<T>
where
    F: Future<Output = std::result::Result<Result<T>, Aborted>>,
{
    match tokio::time::timeout(duration, transport_call).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(Aborted)) => Err(ClientError::Aborted),
        Err(_elapsed) => {
            if let Some(controller) = controller {
                controller.abort();
            }
            Err(ClientError::Timeout {
                status,
                message: message.to_string(),
            })
        }
    }
}
