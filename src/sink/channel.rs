//! Channel-backed sink for in-process consumers

use super::{FeedEvent, OutputSink, SinkError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Forwards events to an mpsc receiver
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<FeedEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<FeedEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn emit(&mut self, event: FeedEvent) -> Result<(), SinkError> {
        self.tx.send(event).await.map_err(|_| SinkError::Closed)
    }
}
