//! # Register Bank
//!
//! Simulated holding registers of a single field device.
//!
//! Every cycle the first `N - 2` registers receive a uniform random reading in
//! `[0, 100]` and the final pair is overwritten with the two 16-bit words of
//! the IEEE-754 single-precision value `1.0` (`0x3F80_0000`). The bank also
//! keeps a snapshot of the last reported readings; [`RegisterBank::has_changed`]
//! is the change-detection gate in front of the remote reporting.
//!
//! The random source is a type parameter so tests can drive the bank with a
//! seeded or constant generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Default number of registers in a bank.
pub const DEFAULT_REGISTER_COUNT: usize = 10;

/// Inclusive upper bound of a random register reading.
pub const REGISTER_MAX: i32 = 100;

/// Floating-point value encoded across the final register pair.
pub const SENTINEL_VALUE: f32 = 1.0;

/// High 16-bit word of [`SENTINEL_VALUE`].
pub const SENTINEL_HIGH: i32 = 0x3F80;

/// Low 16-bit word of [`SENTINEL_VALUE`].
pub const SENTINEL_LOW: i32 = 0x0000;

/// Order in which the two words of a 32-bit value occupy a register pair.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum WordOrder {
    /// High word in the lower register address (Modbus big-endian word order).
    #[default]
    HighFirst,
    /// Low word in the lower register address (word-swapped layout).
    LowFirst,
}

impl WordOrder {
    /// Split `value` into the two register words, in this order.
    pub fn split(self, value: f32) -> [i32; 2] {
        let bits = value.to_bits();
        let high = (bits >> 16) as i32;
        let low = (bits & 0xFFFF) as i32;
        match self {
            WordOrder::HighFirst => [high, low],
            WordOrder::LowFirst => [low, high],
        }
    }

    /// Reassemble a register pair written in this order into an `f32`.
    pub fn join(self, pair: [i32; 2]) -> f32 {
        let (high, low) = match self {
            WordOrder::HighFirst => (pair[0], pair[1]),
            WordOrder::LowFirst => (pair[1], pair[0]),
        };
        f32::from_bits(((high as u32 & 0xFFFF) << 16) | (low as u32 & 0xFFFF))
    }
}

impl std::fmt::Display for WordOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordOrder::HighFirst => write!(f, "high-first"),
            WordOrder::LowFirst => write!(f, "low-first"),
        }
    }
}

/// Render register values as `[a, b, c]`.
pub fn format_registers(values: &[i32]) -> String {
    let body = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{body}]")
}

/// A fixed-size bank of simulated registers plus the last reported snapshot.
#[derive(Debug, Clone)]
pub struct RegisterBank<R = StdRng> {
    values: Vec<i32>,
    snapshot: Vec<i32>,
    word_order: WordOrder,
    rng: R,
}

impl RegisterBank<StdRng> {
    /// Bank of `count` registers driven by an entropy-seeded generator.
    ///
    /// # Errors
    /// Returns [`BridgeError::InvalidConfig`] when `count < 2`.
    pub fn new(count: usize) -> Result<Self> {
        Self::with_rng(count, StdRng::from_entropy())
    }

    /// Bank of `count` registers with a reproducible random sequence.
    pub fn seeded(count: usize, seed: u64) -> Result<Self> {
        Self::with_rng(count, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RegisterBank<R> {
    /// Bank of `count` zeroed registers drawing readings from `rng`.
    ///
    /// # Errors
    /// Returns [`BridgeError::InvalidConfig`] when `count < 2`; the bank needs
    /// at least the two sentinel registers.
    pub fn with_rng(count: usize, rng: R) -> Result<Self> {
        if count < 2 {
            return Err(BridgeError::invalid(
                "register_count",
                format!("must be at least 2, got {count}"),
            ));
        }
        Ok(Self {
            values: vec![0; count],
            snapshot: vec![0; count],
            word_order: WordOrder::default(),
            rng,
        })
    }

    /// Set the word order used for the sentinel pair.
    pub fn word_order(mut self, order: WordOrder) -> Self {
        self.word_order = order;
        self
    }

    /// Fill the bank with a fresh set of readings.
    pub fn regenerate(&mut self) {
        let n = self.values.len();
        for slot in &mut self.values[..n - 2] {
            *slot = self.rng.gen_range(0..=REGISTER_MAX);
        }
        let pair = self.word_order.split(SENTINEL_VALUE);
        self.values[n - 2] = pair[0];
        self.values[n - 1] = pair[1];
    }

    /// Compare the current readings against the last reported snapshot.
    ///
    /// On a difference the snapshot is advanced to the current readings and
    /// `true` is returned. A second call without an intervening
    /// [`regenerate`](Self::regenerate) therefore returns `false`.
    pub fn has_changed(&mut self) -> bool {
        if self.values == self.snapshot {
            return false;
        }
        self.snapshot.clone_from(&self.values);
        true
    }

    /// Current readings rendered as `[a, b, c]`.
    pub fn format_for_report(&self) -> String {
        format_registers(&self.values)
    }

    /// Decode the final register pair back into a float.
    pub fn sentinel_value(&self) -> f32 {
        let n = self.values.len();
        self.word_order.join([self.values[n - 2], self.values[n - 1]])
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn snapshot(&self) -> &[i32] {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`: a bank holds at least the sentinel pair.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
