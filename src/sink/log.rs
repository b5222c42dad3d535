//! Tracing-backed sink

use super::{FeedEvent, OutputSink, SinkError};
use async_trait::async_trait;

/// Reports each event as a structured log line
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputSink for LogSink {
    async fn emit(&mut self, event: FeedEvent) -> Result<(), SinkError> {
        match &event {
            FeedEvent::Price { slot, observation } => {
                tracing::info!(
                    slot,
                    price = %format_args!("${:.2} ±${:.2}", observation.price, observation.confidence),
                    published = %observation.publish_time.to_rfc3339(),
                    time_source = ?observation.time_source,
                    raw_price = observation.raw_price,
                    magic = %observation.magic_hex(),
                    "Price feed update"
                );
            }
            FeedEvent::DecodeFailed { slot, error } => {
                tracing::warn!(slot, error = %error, "Failed to decode price account");
            }
            FeedEvent::ParseFailed { slot, error } => {
                tracing::warn!(slot = ?slot, error = %error, "Error parsing message");
            }
        }
        Ok(())
    }
}
