//! Update pacing
//!
//! A refractory gate that lets through at most one notification per minimum
//! interval, measured from the last admitted notification.

mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use crate::config::GateConfig;

/// Leaky bucket of one with a fixed refractory period
#[derive(Debug, Clone)]
pub struct UpdateGate {
    min_interval_ms: u64,
    last_emitted_at_ms: Option<u64>,
}

impl UpdateGate {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_emitted_at_ms: None,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.min_interval_ms)
    }

    /// Decide whether an event arriving at `now_ms` is admitted
    ///
    /// Admission records `now_ms` as the new baseline. The first call is always
    /// admitted. A clock that went backwards counts as no elapsed time.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        let admitted = match self.last_emitted_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.min_interval_ms,
        };

        if admitted {
            self.last_emitted_at_ms = Some(now_ms);
        }
        admitted
    }

    pub fn last_emitted_at_ms(&self) -> Option<u64> {
        self.last_emitted_at_ms
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }
}

impl Default for UpdateGate {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}
