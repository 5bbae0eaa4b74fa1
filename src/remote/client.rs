//! HTTP client for the remote storage and crypto service.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{CryptoOperation, CryptoRequest, CryptoResult, RemoteError, StoredValue};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// Client for the remote service's `/health`, `/data/{key}` and `/crypto`
/// endpoints.
///
/// Every call is a single request bounded by the configured timeout. Nothing
/// is retried. The plain operations fold all failures into `false` / `None`;
/// the `try_` variants return the [`RemoteError`] instead.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteClient {
    /// Build a client for `base_url` with a per-call `timeout`.
    ///
    /// # Errors
    /// Returns [`BridgeError::Client`] when the underlying HTTP client cannot
    /// be constructed (e.g. no TLS backend available).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        Ok(Self {
            base_url,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `true` iff `GET /health` answers 200.
    pub async fn check_health(&self) -> bool {
        fold(self.try_check_health().await, "health").is_some()
    }

    /// `true` iff `POST /data/{key}` answers 200.
    ///
    /// `key` must already be a URL-path-safe token; it is not escaped.
    pub async fn store_data(&self, key: &str, value: &str) -> bool {
        fold(self.try_store_data(key, value).await, "store").is_some()
    }

    /// Run a remote crypto operation.
    ///
    /// `data` is sent only when non-empty and `length` only when positive.
    /// Returns `None` on transport failure, a non-200 status or a body that is
    /// not a crypto result.
    pub async fn crypto_operation(
        &self,
        operation: CryptoOperation,
        data: Option<&str>,
        length: Option<u32>,
    ) -> Option<CryptoResult> {
        fold(
            self.try_crypto_operation(operation, data, length).await,
            operation.as_str(),
        )
    }

    /// Read back the value stored under `key`.
    ///
    /// `None` when the call fails or the server reports no value for the key.
    pub async fn fetch_data(&self, key: &str) -> Option<String> {
        let stored = fold(self.try_fetch_data(key).await, "fetch")?;
        if stored.success {
            stored.data
        } else {
            debug!(key, error = ?stored.error, "remote reported no stored value");
            None
        }
    }

    pub async fn try_check_health(&self) -> std::result::Result<(), RemoteError> {
        let url = self.url("/health");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        expect_ok(resp, url).map(drop)
    }

    pub async fn try_store_data(
        &self,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), RemoteError> {
        let url = self.url(&format!("/data/{key}"));
        let resp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(value.to_owned())
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        expect_ok(resp, url).map(drop)
    }

    pub async fn try_crypto_operation(
        &self,
        operation: CryptoOperation,
        data: Option<&str>,
        length: Option<u32>,
    ) -> std::result::Result<CryptoResult, RemoteError> {
        let url = self.url("/crypto");
        let request = CryptoRequest::new(operation, data, length);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        decode(expect_ok(resp, url)?).await
    }

    pub async fn try_fetch_data(&self, key: &str) -> std::result::Result<StoredValue, RemoteError> {
        let url = self.url(&format!("/data/{key}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        decode(expect_ok(resp, url)?).await
    }
}

fn expect_ok(
    resp: reqwest::Response,
    url: String,
) -> std::result::Result<reqwest::Response, RemoteError> {
    if resp.status() == StatusCode::OK {
        Ok(resp)
    } else {
        Err(RemoteError::Http {
            status: resp.status().as_u16(),
            url,
        })
    }
}

async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> std::result::Result<T, RemoteError> {
    let url = resp.url().to_string();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| RemoteError::transport(&url, e))?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Json {
        detail: e.to_string(),
    })
}

fn fold<T>(result: std::result::Result<T, RemoteError>, call: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(call, error = %e, transport = e.is_transport(), "remote call failed");
            None
        }
    }
}
