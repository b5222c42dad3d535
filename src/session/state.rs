//! Session lifecycle state

/// Subscription lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the transport to come up
    Connecting,
    /// Request sent, waiting for the matching acknowledgement
    Subscribing { request_id: u64 },
    /// Subscription confirmed
    Streaming { subscription_id: String },
    /// Terminal
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Subscribing { .. } => "subscribing",
            SessionState::Streaming { .. } => "streaming",
            SessionState::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// Whether inbound notifications are processed in this state
    pub fn accepts_notifications(&self) -> bool {
        matches!(
            self,
            SessionState::Subscribing { .. } | SessionState::Streaming { .. }
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-session counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub notifications_received: u64,
    pub notifications_admitted: u64,
    pub notifications_dropped: u64,
    pub observations: u64,
    pub decode_errors: u64,
    pub parse_errors: u64,
}
