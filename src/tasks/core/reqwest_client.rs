//! Reqwest-based implementation of the `TaskHttpClient` trait.
//!
//! Provides a thin adapter around `reqwest::Client`. The underlying client
//! keeps a connection pool, so one instance can serve many concurrent solve
//! calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::Client;
use url::Url;

use super::{CaptchaError, TaskHttpClient, TaskHttpClientError};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Reqwest-backed HTTP client used to reach the captcha service.
#[derive(Debug, Clone)]
pub struct ReqwestTaskHttpClient {
    client: Client,
}

impl ReqwestTaskHttpClient {
    /// Creates a pooled client with a per-request timeout.
    pub fn new() -> Result<Self, CaptchaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| {
                CaptchaError::Configuration(format!("failed to build http client: {err}"))
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client, e.g. one routed through a proxy.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskHttpClient for ReqwestTaskHttpClient {
    async fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<Bytes, TaskHttpClientError> {
        let response = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|err| TaskHttpClientError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskHttpClientError::Status {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|err| TaskHttpClientError::Transport(err.to_string()))
    }
}

type _AssertSync = Arc<ReqwestTaskHttpClient>;
