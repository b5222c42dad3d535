//! Background WebSocket connection task

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Outbound queue depth; only subscription requests travel this way
const OUTBOUND_BUFFER: usize = 16;

/// Duplex JSON text client driven through channels
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Spawn the connection task
    pub fn connect(&self) -> WsConnection {
        let (event_tx, events) = mpsc::channel(self.config.buffer_size);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            supervise(config, event_tx, outbound_rx).await;
        });

        WsConnection {
            events,
            outbound,
            task,
        }
    }
}

/// Handle to a running connection task
pub struct WsConnection {
    /// Inbound frames and connection status, in arrival order
    pub events: mpsc::Receiver<WsMessage>,
    /// Text frames to send
    pub outbound: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Release the connection and wait up to `grace` for the close frame to go out
    pub async fn close(self, grace: Duration) {
        let Self {
            events,
            outbound,
            mut task,
        } = self;
        drop(outbound);
        drop(events);

        if timeout(grace, &mut task).await.is_err() {
            tracing::debug!(?grace, "Connection task did not finish, aborting");
            task.abort();
        }
    }
}

/// Run connections until the session releases them or the retry budget is spent
///
/// A peer close counts as a failure: it is retried like any other when the
/// policy allows, and otherwise reported as `WsError::ClosedByPeer`.
async fn supervise(
    config: WsConfig,
    events: mpsc::Sender<WsMessage>,
    mut outbound: mpsc::Receiver<String>,
) {
    let mut attempt = 0u32;

    loop {
        let mut connected = false;
        let result = stream_once(&config, &events, &mut outbound, &mut connected).await;
        if connected {
            attempt = 0;
        }

        let Err(error) = result else {
            tracing::debug!("Transport released by session");
            return;
        };

        if events.is_closed() {
            return;
        }

        attempt += 1;
        if !config.reconnect.allows(attempt) {
            tracing::error!(error = %error, retries = attempt - 1, "Transport failed");
            let error = match attempt {
                1 => error,
                n => WsError::MaxReconnectsExceeded(n - 1),
            };
            let _ = events.send(WsMessage::Failed(error)).await;
            return;
        }

        let delay = config.reconnect.delay_for(attempt);
        tracing::warn!(error = %error, attempt, ?delay, "Transport failed, reconnecting");
        if events.send(WsMessage::Reconnecting { attempt }).await.is_err() {
            return;
        }
        sleep(delay).await;
    }
}

/// One connection: handshake, then pump frames both ways until it ends
///
/// `Ok` means the session let go of the channels. `connected` is set once the
/// handshake succeeds, so a later failure starts a fresh retry budget.
async fn stream_once(
    config: &WsConfig,
    events: &mpsc::Sender<WsMessage>,
    outbound: &mut mpsc::Receiver<String>,
    connected: &mut bool,
) -> Result<(), WsError> {
    tracing::info!(url = %config.url, "Connecting");

    let (stream, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
    let (mut write, mut read) = stream.split();
    *connected = true;

    if events.send(WsMessage::Connected).await.is_err() {
        return Ok(());
    }

    let mut keepalive = interval(config.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    keepalive.tick().await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            frame = read.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => WsMessage::Text(text),
                    Some(Ok(Message::Binary(data))) => WsMessage::Binary(data),
                    Some(Ok(Message::Ping(payload))) => {
                        write
                            .send(Message::Pong(payload))
                            .await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = false;
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(url = %config.url, ?frame, "Peer closed the connection");
                        return Err(WsError::ClosedByPeer);
                    }
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Err(e)) => return Err(WsError::ConnectionFailed(e.to_string())),
                    None => {
                        return Err(WsError::ConnectionFailed(
                            "stream ended without a close frame".into(),
                        ))
                    }
                };

                if events.send(event).await.is_err() {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }

            request = outbound.recv() => {
                let Some(text) = request else {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                tracing::trace!(bytes = text.len(), "Sending request");
                write
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| WsError::SendFailed(e.to_string()))?;
            }

            _ = keepalive.tick() => {
                if awaiting_pong {
                    return Err(WsError::ConnectionFailed("pong timeout".into()));
                }
                write
                    .send(Message::Ping(Vec::new()))
                    .await
                    .map_err(|e| WsError::SendFailed(e.to_string()))?;
                awaiting_pong = true;
            }
        }
    }
}
