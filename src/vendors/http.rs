use crate::resilience::CallError;
use reqwest::{Client, Response};
use std::time::Duration;

/// Vendor HTTP client with the pool/timeout profile all adapters share.
pub(super) fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Map a non-2xx response to a classified [`CallError`], carrying a short
/// body snippet for the logs.
pub(super) async fn ensure_success(response: Response) -> Result<Response, CallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(CallError::status(status.as_u16(), snippet))
}
