//! Output sinks
//!
//! Every admitted notification ends up here as exactly one [`FeedEvent`].

mod channel;
mod json;
mod log;

pub use channel::ChannelSink;
pub use json::JsonLinesSink;
pub use log::LogSink;

use crate::decoder::{DecodeError, PriceObservation};
use crate::session::ParseError;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Outcome of one admitted notification, or of an unparseable message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Successfully decoded price
    Price {
        slot: u64,
        observation: PriceObservation,
    },
    /// Account bytes did not match the price layout
    DecodeFailed {
        slot: u64,
        #[serde(serialize_with = "serialize_display")]
        error: DecodeError,
    },
    /// Transport message could not be interpreted
    ParseFailed {
        slot: Option<u64>,
        #[serde(serialize_with = "serialize_display")]
        error: ParseError,
    },
}

impl FeedEvent {
    pub fn slot(&self) -> Option<u64> {
        match self {
            FeedEvent::Price { slot, .. } | FeedEvent::DecodeFailed { slot, .. } => Some(*slot),
            FeedEvent::ParseFailed { slot, .. } => *slot,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, FeedEvent::Price { .. })
    }
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Errors raised while handing an event to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// The consumer went away; the session stops
    #[error("Sink closed")]
    Closed,

    #[error("Sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Consumer of feed events
#[async_trait]
pub trait OutputSink: Send {
    /// Deliver one event
    async fn emit(&mut self, event: FeedEvent) -> Result<(), SinkError>;
}

#[async_trait]
impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    async fn emit(&mut self, event: FeedEvent) -> Result<(), SinkError> {
        (**self).emit(event).await
    }
}
