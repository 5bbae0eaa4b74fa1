use std::path::PathBuf;

use clap::Parser;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::registers::WordOrder;

#[derive(Parser, Debug)]
#[command(name = "register-bridge")]
#[command(version)]
#[command(about = "Report simulated device registers to a remote storage and crypto service")]
pub struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Base URL of the remote service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of simulated registers, including the sentinel pair
    #[arg(long)]
    pub register_count: Option<usize>,

    /// Seconds between simulation ticks
    #[arg(long)]
    pub tick_interval: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    pub http_timeout: Option<u64>,

    /// Source label; reports are stored under `<source>_message`
    #[arg(long)]
    pub source: Option<String>,

    /// Word order of the sentinel register pair
    #[arg(long, value_enum)]
    pub word_order: Option<WordOrder>,

    /// Seed for reproducible register readings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read every stored report back from the service
    #[arg(long)]
    pub verify_store: bool,

    /// Stop after this many ticks (0 runs until interrupted)
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Defaults, then the config file, then flags. Not validated.
    pub fn resolve_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(n) = self.register_count {
            config.register_count = n;
        }
        if let Some(secs) = self.tick_interval {
            config.tick_interval_secs = secs;
        }
        if let Some(secs) = self.http_timeout {
            config.http_timeout_secs = secs;
        }
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(order) = self.word_order {
            config.word_order = order;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.verify_store {
            config.verify_store = true;
        }
        if let Some(n) = self.max_cycles {
            config.max_cycles = n;
        }
        Ok(config)
    }
}
