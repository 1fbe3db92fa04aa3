use crate::CommunicatorError;
use std::future::Future;
use std::time::Duration;

/// Run a transport request, failing with [`CommunicatorError::Timeout`] if it
/// has not completed within `limit`. The request future is dropped on expiry.
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, request: F) -> Result<T, CommunicatorError>
where
    F: Future<Output = Result<T, CommunicatorError>>,
{
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(CommunicatorError::Timeout {
            operation,
            after_ms: limit.as_millis() as u64,
        }),
    }
}
