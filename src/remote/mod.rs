//! # Remote Service Client
//!
//! Talks to the remote compute service the bridge reports into.
//!
//! ## Endpoints
//!
//! 1. **Health** — `GET /health`, 200 means the service is up.
//! 2. **Storage** — `POST /data/{key}` with a `text/plain` body stores a value;
//!    `GET /data/{key}` reads it back.
//! 3. **Crypto** — `POST /crypto` with `{"operation", "data"?, "length"?}`
//!    returns `{"success", "data": {"result", ...}}`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = RemoteClient::new("http://localhost:5000", Duration::from_secs(5))?;
//! if client.check_health().await {
//!     client.store_data("rust_message", "[1, 2, 3]_2024-01-01 00:00:00").await;
//! }
//! ```

pub mod client;
pub mod types;

pub use client::RemoteClient;
pub use types::{CryptoOperation, CryptoPayload, CryptoRequest, CryptoResult, RemoteError, StoredValue};
