//! Clients for the services behind the gateway
//!
//! Both clients retry connection failures, timeouts and 5xx answers a fixed
//! number of times with a fixed delay. Anything else is returned to the caller
//! as a [`ClientError`].

pub mod attribution;
pub mod ssas;

pub use attribution::{AttributionClient, HttpAttributionClient};
pub use ssas::{HttpSsasClient, SsasClient, TokenInfo};

use bytes::Bytes;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Empty response body")]
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay_ms: u64) -> Self {
        Self {
            retries,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn should_retry(result: &Result<Response, reqwest::Error>) -> bool {
        match result {
            Ok(response) => response.status().is_server_error(),
            Err(e) => e.is_connect() || e.is_timeout(),
        }
    }

    /// Send the request built by `build`, retrying per the policy.
    ///
    /// `build` is called once per attempt since a sent request is consumed.
    pub async fn send<F>(&self, build: F) -> ClientResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = build().send().await;
            if attempt >= self.retries || !Self::should_retry(&result) {
                return Ok(result?);
            }
            attempt += 1;
            match &result {
                Ok(response) => tracing::warn!(
                    attempt,
                    max_retries = self.retries,
                    status = response.status().as_u16(),
                    "Retrying request"
                ),
                Err(e) => tracing::warn!(
                    attempt,
                    max_retries = self.retries,
                    error = %e,
                    "Retrying request"
                ),
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Read a successful body, or turn a non-2xx answer into [`ClientError::Status`].
async fn success_body(response: Response) -> ClientResult<Bytes> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body)
}

/// `base` with `segments` appended as percent-encoded path segments.
fn endpoint(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
