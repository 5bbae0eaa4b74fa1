//! # Bridge Loop
//!
//! Drives the register simulator and reports changes to the remote service.
//!
//! ## Cycle
//!
//! 1. Regenerate the register bank and capture a local timestamp.
//! 2. Ask the bank whether it differs from the last reported state.
//! 3. On a change: store `"[registers]_timestamp"` under `<source>_message`,
//!    then request 16 random hex bytes and the SHA-256 of the timestamp.
//!
//! Each remote call is attempted once. A failure is logged and the next call
//! still runs. The only fatal condition is a failed health probe at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut agent = BridgeAgent::builder(config).build()?;
//! agent.run_until(tokio::signal::ctrl_c().map(drop)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::registers::RegisterBank;
use crate::remote::{CryptoOperation, CryptoResult, RemoteClient};

/// `strftime` pattern of report timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Byte length requested from the `random_hex` operation.
pub const RANDOM_HEX_LENGTH: u32 = 16;

/// Number of digest characters written to the log.
pub const DIGEST_PREVIEW_LEN: usize = 16;

/// Source of report timestamps.
pub trait Clock {
    fn timestamp(&self) -> String;
}

/// Wall-clock time in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Where the loop currently is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Waiting for the next tick.
    Idle,
    /// A change was detected and the remote calls are in flight.
    Reporting,
}

/// Per-call results of one reported change.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    /// Body sent to the storage endpoint.
    pub message: String,
    pub timestamp: String,
    pub stored: bool,
    /// Read-back result; `None` unless `verify_store` is on and the store succeeded.
    pub verified: Option<bool>,
    pub random_hex: Option<CryptoResult>,
    pub digest: Option<CryptoResult>,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Registers matched the last reported state; nothing was sent.
    Unchanged { timestamp: String },
    Reported(ReportOutcome),
}

impl CycleReport {
    pub fn is_reported(&self) -> bool {
        matches!(self, CycleReport::Reported(_))
    }
}

/// The bridge agent: register bank, remote client and loop state.
pub struct BridgeAgent<R = StdRng, C = LocalClock> {
    bank: RegisterBank<R>,
    client: RemoteClient,
    clock: C,
    storage_key: String,
    tick_interval: Duration,
    verify_store: bool,
    max_cycles: u64,
    state: BridgeState,
    cycles: u64,
}

impl BridgeAgent {
    /// Start building an agent from a configuration.
    pub fn builder(config: BridgeConfig) -> BridgeAgentBuilder {
        BridgeAgentBuilder::new(config)
    }
}

impl<R: Rng, C: Clock> BridgeAgent<R, C> {
    pub fn bank(&self) -> &RegisterBank<R> {
        &self.bank
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Ticks run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Probe the remote service once.
    ///
    /// # Errors
    /// Returns [`BridgeError::ServiceUnavailable`] when `/health` does not
    /// answer 200.
    pub async fn start(&self) -> Result<()> {
        if self.client.check_health().await {
            info!(url = %self.client.base_url(), "remote service is available, starting bridge");
            Ok(())
        } else {
            Err(BridgeError::ServiceUnavailable {
                url: self.client.base_url().to_owned(),
            })
        }
    }

    /// Run one tick: regenerate, check for a change, report if changed.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.bank.regenerate();
        let timestamp = self.clock.timestamp();
        self.cycles += 1;

        if !self.bank.has_changed() {
            debug!(cycle = self.cycles, "registers unchanged, nothing to report");
            return CycleReport::Unchanged { timestamp };
        }

        self.state = BridgeState::Reporting;
        let outcome = self.report(timestamp).await;
        self.state = BridgeState::Idle;
        CycleReport::Reported(outcome)
    }

    async fn report(&self, timestamp: String) -> ReportOutcome {
        let message = format!("{}_{}", self.bank.format_for_report(), timestamp);

        let stored = self.client.store_data(&self.storage_key, &message).await;
        if stored {
            info!(key = %self.storage_key, %message, "stored message");
        } else {
            warn!(key = %self.storage_key, "failed to store message");
        }

        let verified = if stored && self.verify_store {
            Some(self.verify_stored(&message).await)
        } else {
            None
        };

        let random_hex = self
            .client
            .crypto_operation(CryptoOperation::RandomHex, None, Some(RANDOM_HEX_LENGTH))
            .await;
        match random_hex.as_ref().and_then(CryptoResult::output) {
            Some(hex) => info!(hex, "generated random hex"),
            None => warn!(
                error = ?random_hex.as_ref().and_then(|r| r.error.as_deref()),
                "failed to generate random hex"
            ),
        }

        let digest = self
            .client
            .crypto_operation(CryptoOperation::Sha256, Some(&timestamp), None)
            .await;
        match digest.as_ref().and_then(CryptoResult::output) {
            Some(hash) => match hash.get(..DIGEST_PREVIEW_LEN) {
                Some(preview) => info!(sha256 = %preview, %timestamp, "hashed timestamp"),
                None => warn!(len = hash.len(), "digest shorter than expected"),
            },
            None => warn!(
                error = ?digest.as_ref().and_then(|r| r.error.as_deref()),
                "failed to hash timestamp"
            ),
        }

        ReportOutcome {
            message,
            timestamp,
            stored,
            verified,
            random_hex,
            digest,
        }
    }

    async fn verify_stored(&self, message: &str) -> bool {
        match self.client.fetch_data(&self.storage_key).await {
            Some(stored) if stored == message => {
                debug!(key = %self.storage_key, "stored message read back");
                true
            }
            Some(stored) => {
                warn!(key = %self.storage_key, %stored, "stored message differs on read back");
                false
            }
            None => {
                warn!(key = %self.storage_key, "stored message could not be read back");
                false
            }
        }
    }

    /// Probe the service, then tick until `shutdown` resolves.
    ///
    /// A cycle that has started always runs to completion; `shutdown` is only
    /// observed between cycles. Also stops after `max_cycles` ticks when that
    /// limit is non-zero. Returns the number of ticks run.
    ///
    /// # Errors
    /// Returns [`BridgeError::ServiceUnavailable`] when the startup probe
    /// fails; no tick is run in that case.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(cycles = self.cycles, "shutdown requested");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.run_cycle().await;

            if self.max_cycles > 0 && self.cycles >= self.max_cycles {
                info!(cycles = self.cycles, "cycle limit reached");
                break;
            }
        }

        Ok(self.cycles)
    }
}

/// Builder for [`BridgeAgent`].
pub struct BridgeAgentBuilder {
    config: BridgeConfig,
    tick_interval: Option<Duration>,
}

impl BridgeAgentBuilder {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            tick_interval: None,
        }
    }

    /// Override the tick interval from the configuration.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Build an agent with the standard generator and local clock.
    ///
    /// The generator is seeded from `config.seed` when present.
    ///
    /// # Errors
    /// Returns [`BridgeError::InvalidConfig`] when the configuration does not
    /// validate, or [`BridgeError::Client`] when the HTTP client cannot be built.
    pub fn build(self) -> Result<BridgeAgent> {
        self.config.validate()?;
        let bank = match self.config.seed {
            Some(seed) => RegisterBank::seeded(self.config.register_count, seed)?,
            None => RegisterBank::new(self.config.register_count)?,
        };
        self.assemble(bank, LocalClock)
    }

    /// Build an agent drawing readings from `rng` and timestamps from `clock`.
    pub fn build_with<R: Rng, C: Clock>(self, rng: R, clock: C) -> Result<BridgeAgent<R, C>> {
        self.config.validate()?;
        let bank = RegisterBank::with_rng(self.config.register_count, rng)?;
        self.assemble(bank, clock)
    }

    fn assemble<R: Rng, C: Clock>(
        self,
        bank: RegisterBank<R>,
        clock: C,
    ) -> Result<BridgeAgent<R, C>> {
        if self.tick_interval.is_some_and(|d| d.is_zero()) {
            return Err(BridgeError::invalid("tick_interval", "must be positive"));
        }
        let client = RemoteClient::from_config(&self.config)?;
        Ok(BridgeAgent {
            bank: bank.word_order(self.config.word_order),
            client,
            clock,
            storage_key: self.config.storage_key(),
            tick_interval: self.tick_interval.unwrap_or(self.config.tick_interval()),
            verify_store: self.config.verify_store,
            max_cycles: self.config.max_cycles,
            state: BridgeState::Idle,
            cycles: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::WordOrder;
    use rand::rngs::mock::StepRng;

    struct FixedClock;

    impl Clock for FixedClock {
        fn timestamp(&self) -> String {
            "2024-05-01 12:00:00".to_string()
        }
    }

    fn offline_config() -> BridgeConfig {
        BridgeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            http_timeout_secs: 1,
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let cfg = BridgeConfig {
            register_count: 0,
            ..BridgeConfig::default()
        };
        assert!(BridgeAgent::builder(cfg).build().is_err());
    }

    #[test]
    fn builder_applies_config() {
        let cfg = BridgeConfig {
            source: "java".into(),
            register_count: 4,
            word_order: WordOrder::LowFirst,
            ..BridgeConfig::default()
        };
        let agent = BridgeAgent::builder(cfg).build().unwrap();
        assert_eq!(agent.storage_key, "java_message");
        assert_eq!(agent.bank().len(), 4);
        assert_eq!(agent.tick_interval, Duration::from_secs(2));
        assert_eq!(agent.state(), BridgeState::Idle);
        assert_eq!(agent.cycles(), 0);
    }

    #[test]
    fn builder_tick_interval_override() {
        let agent = BridgeAgent::builder(BridgeConfig::default())
            .tick_interval(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(agent.tick_interval, Duration::from_millis(50));
    }

    #[test]
    fn builder_rejects_zero_tick_interval() {
        let result = BridgeAgent::builder(BridgeConfig::default())
            .tick_interval(Duration::ZERO)
            .build_with(StepRng::new(0, 0), FixedClock);
        let err = result.err().expect("zero interval must not build");
        assert!(err.to_string().contains("tick_interval"), "{err}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn seeded_agents_generate_identical_readings() {
        let cfg = BridgeConfig {
            seed: Some(42),
            ..BridgeConfig::default()
        };
        let mut a = BridgeAgent::builder(cfg.clone()).build().unwrap();
        let mut b = BridgeAgent::builder(cfg).build().unwrap();
        a.bank.regenerate();
        b.bank.regenerate();
        assert_eq!(a.bank().values(), b.bank().values());
    }

    #[test]
    fn local_clock_matches_format() {
        let ts = LocalClock.timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
    }

    #[tokio::test]
    async fn start_fails_when_service_unreachable() {
        let agent = BridgeAgent::builder(offline_config())
            .build_with(StepRng::new(0, 0), FixedClock)
            .unwrap();
        let err = agent.start().await.unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn run_until_never_ticks_without_service() {
        let mut agent = BridgeAgent::builder(offline_config())
            .build_with(StepRng::new(0, 0), FixedClock)
            .unwrap();
        assert!(agent.run_until(std::future::pending()).await.is_err());
        assert_eq!(agent.cycles(), 0);
        assert!(!agent.bank().values().iter().any(|v| *v != 0));
    }

    #[tokio::test]
    async fn unchanged_cycle_makes_no_calls() {
        let mut agent = BridgeAgent::builder(offline_config())
            .build_with(StepRng::new(0, 0), FixedClock)
            .unwrap();
        assert!(agent.run_cycle().await.is_reported());
        let second = agent.run_cycle().await;
        assert_eq!(
            second,
            CycleReport::Unchanged {
                timestamp: "2024-05-01 12:00:00".to_string()
            }
        );
        assert_eq!(agent.cycles(), 2);
        assert_eq!(agent.state(), BridgeState::Idle);
    }

    #[tokio::test]
    async fn failed_calls_still_produce_report() {
        let mut agent = BridgeAgent::builder(offline_config())
            .build_with(StepRng::new(0, 0), FixedClock)
            .unwrap();
        match agent.run_cycle().await {
            CycleReport::Reported(outcome) => {
                assert_eq!(
                    outcome.message,
                    "[0, 0, 0, 0, 0, 0, 0, 0, 16256, 0]_2024-05-01 12:00:00"
                );
                assert!(!outcome.stored);
                assert_eq!(outcome.verified, None);
                assert!(outcome.random_hex.is_none());
                assert!(outcome.digest.is_none());
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }
}
