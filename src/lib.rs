//! # register-bridge
//!
//! A periodic telemetry bridge. It simulates a bank of device holding
//! registers, detects when the readings change, and reports every change to a
//! remote service's storage and crypto endpoints over HTTP.
//!
//! - [`registers`]: the simulated register bank and its change gate.
//! - [`remote`]: the HTTP client for `/health`, `/data/{key}` and `/crypto`.
//! - [`bridge`]: the control loop sequencing the two.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod registers;
pub mod remote;

pub use bridge::{BridgeAgent, BridgeAgentBuilder, BridgeState, Clock, CycleReport, LocalClock, ReportOutcome};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use registers::{RegisterBank, WordOrder};
pub use remote::{CryptoOperation, CryptoResult, RemoteClient, RemoteError};
