use std::future::Future;
use std::time::Duration;

use rand::{thread_rng, Rng};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};

const BASE_DELAY_MS: u64 = 800;
/// Delays stop doubling after this many attempts.
const MAX_BACKOFF_EXP: usize = 6;
const ERROR_SNIPPET_LEN: usize = 400;

pub fn build_client(timeout: Duration) -> SyncResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SyncError::service_fatal("http", e.to_string()))
}

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let exp = attempt.min(MAX_BACKOFF_EXP) as u32;
    let ms = BASE_DELAY_MS.saturating_mul(1 << exp).saturating_add(jitter);
    Duration::from_millis(ms)
}

/// Sends the request built by `build`, retrying transport failures, 408, 429 and
/// 5xx with exponential backoff. Returns the parsed JSON body.
pub async fn send_json(
    provider: &str,
    max_retries: usize,
    build: &(dyn Fn() -> RequestBuilder + Send + Sync),
) -> SyncResult<Value> {
    with_retries(provider, max_retries, || send_once(provider, build)).await
}

/// Runs `attempt` up to `max_retries` times (at least once) while it fails with a
/// retryable error, sleeping [`backoff`] between tries. The last error is returned.
async fn with_retries<T, F, Fut>(provider: &str, max_retries: usize, mut attempt: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let attempts = max_retries.max(1);
    let mut last_err = SyncError::service_fatal(provider, "no request attempted");

    for n in 0..attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retry = err.is_retryable() && n + 1 < attempts;
                tracing::debug!(provider, attempt = n, retry, error = %err, "request failed");
                last_err = err;
                if !retry {
                    break;
                }
                tokio::time::sleep(backoff(n)).await;
            }
        }
    }

    Err(last_err)
}

async fn send_once(
    provider: &str,
    build: &(dyn Fn() -> RequestBuilder + Send + Sync),
) -> SyncResult<Value> {
    let resp = build()
        .send()
        .await
        .map_err(|e| SyncError::service_retryable(provider, e.to_string()))?;

    let status = resp.status();

    // Read as text first so an error body survives a JSON failure.
    let text = resp
        .text()
        .await
        .map_err(|e| SyncError::service_retryable(provider, e.to_string()))?;

    if !status.is_success() {
        let message = extract_error_message(status, &text);
        return Err(if should_retry_http(status) {
            SyncError::service_retryable(provider, message)
        } else {
            SyncError::service_fatal(provider, message)
        });
    }

    serde_json::from_str(&text)
        .map_err(|_| SyncError::service_retryable(provider, "invalid JSON from backend"))
}

fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// `{ "error": { "message": .. } }`, `{ "message": .. }`, or a truncated raw body.
pub fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet = if trimmed.chars().count() > ERROR_SNIPPET_LEN {
        let cut: String = trimmed.chars().take(ERROR_SNIPPET_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}
