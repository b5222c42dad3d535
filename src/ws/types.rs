//! Transport configuration and events

use crate::config::TransportConfig;
use std::time::Duration;
use thiserror::Error;

/// Bounded exponential backoff between connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries allowed after the first failure; zero makes the first failure final
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Never reconnect
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Whether retry number `attempt` (1-based) is permitted
    pub fn allows(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    /// Delay before retry number `attempt`: doubles from `initial_delay`, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Settings for one subscription transport
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// JSON-RPC WebSocket endpoint
    pub url: String,
    pub reconnect: ReconnectPolicy,
    /// A ping left unanswered for one interval fails the connection
    pub ping_interval: Duration,
    /// Capacity of the inbound event channel
    pub buffer_size: usize,
}

impl WsConfig {
    /// Config for `url` with reconnection disabled
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy::disabled(),
            ping_interval: Duration::from_secs(30),
            buffer_size: 1024,
        }
    }

    /// Config for `url` taken from the `[transport]` section
    pub fn from_transport(url: impl Into<String>, transport: &TransportConfig) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectPolicy {
                max_attempts: transport.max_reconnects,
                initial_delay: transport.initial_delay(),
                max_delay: transport.max_delay(),
            },
            ping_interval: transport.ping_interval(),
            buffer_size: transport.buffer_size.max(1),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Transport events, in arrival order
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Handshake completed; the subscription must be (re)issued
    Connected,
    Text(String),
    Binary(Vec<u8>),
    /// Connection lost or closed by the peer; retry `attempt` follows after the backoff delay
    Reconnecting { attempt: u32 },
    /// Connection lost or closed by the peer with no retries left
    Failed(WsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed by peer")]
    ClosedByPeer,

    #[error("Gave up after {0} reconnection attempts")]
    MaxReconnectsExceeded(u32),

    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),
}
