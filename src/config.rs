//! Configuration types for oracle-subscriber

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default devnet endpoint the price account lives on
pub const DEFAULT_WS_URL: &str = "wss://devnet.magicblock.app";

/// Default oracle price account
pub const DEFAULT_ACCOUNT: &str = "ENYwebBThHzmzwPLAQvCucUTsjyfBSZdD9ViXksS4jPu";

/// Layout tag at the start of every price account
pub const DEFAULT_MAGIC: u32 = 0x240e_a1ea;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Subscription target
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// JSON-RPC WebSocket endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Account address to subscribe to
    #[serde(default = "default_account")]
    pub account: String,
    /// Commitment level requested for account notifications
    #[serde(default)]
    pub commitment: Commitment,
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}
fn default_account() -> String {
    DEFAULT_ACCOUNT.to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            account: default_account(),
            commitment: Commitment::default(),
        }
    }
}

/// Commitment level for the observed account state
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Commitment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => anyhow::bail!("unknown commitment level: {}", other),
        }
    }
}

/// WebSocket transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Reconnection attempts after a transport failure (0 = closure is final)
    #[serde(default)]
    pub max_reconnects: u32,
    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Keepalive ping interval in seconds
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Inbound message channel capacity
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_ping_interval_secs() -> u64 {
    30
}
fn default_buffer_size() -> usize {
    1024
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_reconnects: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl TransportConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

/// Binary layout of the price account
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Expected little-endian u32 at offset 0
    #[serde(default = "default_magic")]
    pub magic: u32,
    /// Minimum account length holding the price field
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    /// Offset of the i64 LE raw price
    #[serde(default = "default_price_offset")]
    pub price_offset: usize,
    /// Fixed-point divisor applied to the raw price
    #[serde(default = "default_price_divisor")]
    pub price_divisor: u64,
    /// Offset of the u64 LE publish timestamp candidate
    #[serde(default = "default_timestamp_offset")]
    pub timestamp_offset: usize,
    /// Divisor turning the timestamp candidate into epoch milliseconds
    #[serde(default = "default_timestamp_divisor")]
    pub timestamp_divisor: u64,
    /// Earliest calendar year accepted for a recovered timestamp
    #[serde(default = "default_min_year")]
    pub min_plausible_year: i32,
    /// Latest calendar year accepted for a recovered timestamp
    #[serde(default = "default_max_year")]
    pub max_plausible_year: i32,
}

fn default_magic() -> u32 {
    DEFAULT_MAGIC
}
fn default_min_len() -> usize {
    81
}
fn default_price_offset() -> usize {
    73
}
fn default_price_divisor() -> u64 {
    100_000_000
}
fn default_timestamp_offset() -> usize {
    88
}
fn default_timestamp_divisor() -> u64 {
    1_000
}
fn default_min_year() -> i32 {
    2020
}
fn default_max_year() -> i32 {
    2030
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            magic: default_magic(),
            min_len: default_min_len(),
            price_offset: default_price_offset(),
            price_divisor: default_price_divisor(),
            timestamp_offset: default_timestamp_offset(),
            timestamp_divisor: default_timestamp_divisor(),
            min_plausible_year: default_min_year(),
            max_plausible_year: default_max_year(),
        }
    }
}

/// Update pacing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// Minimum milliseconds between two emitted updates
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    1_000
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the decoder or transport cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.feed.ws_url.starts_with("ws://") || self.feed.ws_url.starts_with("wss://"),
            "feed.ws_url must be a ws:// or wss:// URL, got {}",
            self.feed.ws_url
        );
        anyhow::ensure!(
            !self.feed.account.trim().is_empty(),
            "feed.account must not be empty"
        );
        self.layout.validate()?;
        Ok(())
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.price_divisor != 0, "layout.price_divisor must be non-zero");
        anyhow::ensure!(
            self.timestamp_divisor != 0,
            "layout.timestamp_divisor must be non-zero"
        );
        anyhow::ensure!(
            self.price_offset
                .checked_add(8)
                .is_some_and(|end| self.min_len >= end),
            "layout.min_len ({}) must cover the price field at offset {}",
            self.min_len,
            self.price_offset
        );
        anyhow::ensure!(
            self.timestamp_offset.checked_add(8).is_some(),
            "layout.timestamp_offset ({}) leaves no room for an 8-byte field",
            self.timestamp_offset
        );
        anyhow::ensure!(
            self.min_plausible_year <= self.max_plausible_year,
            "layout plausible year range is empty ({}..={})",
            self.min_plausible_year,
            self.max_plausible_year
        );
        Ok(())
    }
}
