//! Wire types of the remote storage/crypto service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operations understood by the remote `/crypto` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoOperation {
    /// Random bytes of `length`, hex encoded.
    RandomHex,
    /// Random bytes of `length`, base64 encoded.
    RandomBase64,
    /// SHA-256 digest of `data`, hex encoded.
    Sha256,
    /// Random token of `length` characters.
    Token,
}

impl CryptoOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            CryptoOperation::RandomHex => "random_hex",
            CryptoOperation::RandomBase64 => "random_base64",
            CryptoOperation::Sha256 => "sha256",
            CryptoOperation::Token => "token",
        }
    }
}

impl std::fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body of a `/crypto` request.
///
/// `data` is sent only when non-empty and `length` only when positive;
/// absent fields are omitted rather than serialized as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoRequest {
    pub operation: CryptoOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

impl CryptoRequest {
    pub fn new(operation: CryptoOperation, data: Option<&str>, length: Option<u32>) -> Self {
        Self {
            operation,
            data: data.filter(|d| !d.is_empty()).map(str::to_owned),
            length: length.filter(|l| *l > 0),
        }
    }
}

/// Nested payload of a successful crypto response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CryptoPayload {
    /// Primary output: hex string, base64 string, token or digest.
    pub result: String,
    /// Echo of the requested operation, when the server includes it.
    #[serde(default)]
    pub operation: Option<String>,
}

/// Decoded `/crypto` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CryptoResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<CryptoPayload>,
    /// Failure message reported by the server when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl CryptoResult {
    /// The primary output, only when the server reported success.
    pub fn output(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data.as_ref().map(|d| d.result.as_str())
    }
}

/// Envelope returned by `GET /data/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredValue {
    pub success: bool,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Why a remote call failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be delivered or the response not received.
    #[error("connection to {url} failed: {detail}")]
    Connect { url: String, detail: String },
    /// The request exceeded the per-call timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },
    /// The server answered with a status other than 200.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    /// The response body was not the expected JSON shape.
    #[error("malformed response body: {detail}")]
    Json { detail: String },
}

impl RemoteError {
    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout {
                url: url.to_owned(),
            }
        } else {
            RemoteError::Connect {
                url: url.to_owned(),
                detail: err.to_string(),
            }
        }
    }

    /// True for failures that happened before any status was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Connect { .. } | RemoteError::Timeout { .. })
    }
}
