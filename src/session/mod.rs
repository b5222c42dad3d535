//! Subscription session
//!
//! Owns one `accountSubscribe` subscription from handshake to close. Inbound
//! transport events are handled one at a time: notifications pass through the
//! update gate, admitted ones are decoded, and each outcome goes to the sink.

mod protocol;
mod state;

pub use protocol::{
    notification_slot, subscription_id_string, InboundMessage, ParseError, RawNotification,
    SubscribeRequest, ACCOUNT_DATA_ENCODING,
};
pub use state::{SessionState, SessionStats};

use crate::config::{Commitment, Config, GateConfig, LayoutConfig};
use crate::decoder::PriceDecoder;
use crate::gate::{Clock, MonotonicClock, UpdateGate};
use crate::sink::{FeedEvent, OutputSink, SinkError};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use crate::ws::{WsClient, WsConfig, WsError, WsMessage};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a closing session waits for the transport to send its close frame
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Fatal session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] WsError),

    #[error("Failed to encode subscription request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything a session needs besides its sink
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ws: WsConfig,
    pub account: String,
    pub commitment: Commitment,
    pub layout: LayoutConfig,
    pub gate: GateConfig,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ws: WsConfig::from_transport(&config.feed.ws_url, &config.transport),
            account: config.feed.account.clone(),
            commitment: config.feed.commitment,
            layout: config.layout.clone(),
            gate: config.gate.clone(),
        }
    }
}

/// A single live account subscription
pub struct SubscriptionSession<S, C = MonotonicClock> {
    config: SessionConfig,
    decoder: PriceDecoder,
    gate: UpdateGate,
    clock: C,
    sink: S,
    state: SessionState,
    next_request_id: u64,
    stats: SessionStats,
}

impl<S: OutputSink> SubscriptionSession<S, MonotonicClock> {
    /// Create a session paced by the monotonic system clock
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self::with_clock(config, sink, MonotonicClock::new())
    }
}

impl<S: OutputSink, C: Clock> SubscriptionSession<S, C> {
    /// Create a session with an explicit pacing clock
    pub fn with_clock(config: SessionConfig, sink: S, clock: C) -> Self {
        Self {
            decoder: PriceDecoder::new(config.layout.clone()),
            gate: UpdateGate::from_config(&config.gate),
            config,
            clock,
            sink,
            state: SessionState::Connecting,
            next_request_id: 1,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn subscription_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Streaming { subscription_id } => Some(subscription_id),
            _ => None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Move to the terminal state
    pub fn close(&mut self) {
        if !self.state.is_closed() {
            tracing::info!(from = %self.state, "Closing subscription session");
            self.state = SessionState::Closed;
        }
    }

    /// Connect, subscribe and stream until shutdown
    ///
    /// Only a close this side asked for returns the stats: `shutdown`
    /// completing or the sink going away. A transport failure, including the
    /// peer closing the connection once reconnects are used up, closes the
    /// session and is returned as an error.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SessionStats, SessionError>
    where
        F: Future<Output = ()>,
    {
        if self.state.is_closed() {
            return Ok(self.stats);
        }

        tracing::info!(
            url = %self.config.ws.url,
            account = %self.config.account,
            "Starting price feed subscription"
        );

        let mut connection = WsClient::new(self.config.ws.clone()).connect();
        tokio::pin!(shutdown);

        let outcome = loop {
            if self.state.is_closed() {
                break Ok(());
            }

            tokio::select! {
                msg = connection.events.recv() => {
                    let Some(msg) = msg else {
                        break Err(SessionError::Transport(WsError::ChannelClosed));
                    };

                    match self.handle_transport(msg).await {
                        Ok(Some(outbound)) => {
                            if connection.outbound.send(outbound).await.is_err() {
                                break Err(SessionError::Transport(WsError::ChannelClosed));
                            }
                        }
                        Ok(None) => {}
                        Err(e) => break Err(e),
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    self.close();
                }
            }
        };

        self.close();
        connection.close(CLOSE_GRACE).await;
        outcome.map(|()| self.stats)
    }

    /// Apply one transport event
    ///
    /// Returns the text frame to send back, if any.
    pub async fn handle_transport(
        &mut self,
        msg: WsMessage,
    ) -> Result<Option<String>, SessionError> {
        if self.state.is_closed() {
            return Ok(None);
        }

        match msg {
            WsMessage::Connected => self.subscribe().map(Some),
            WsMessage::Text(text) => {
                self.handle_text(&text).await;
                Ok(None)
            }
            WsMessage::Binary(data) => {
                match String::from_utf8(data) {
                    Ok(text) => self.handle_text(&text).await,
                    Err(_) => self.report_parse_error(None, ParseError::NonUtf8).await,
                }
                Ok(None)
            }
            WsMessage::Reconnecting { attempt } => {
                tracing::warn!(attempt, "Transport reconnecting, subscription will be renewed");
                self.state = SessionState::Connecting;
                Ok(None)
            }
            WsMessage::Failed(e) => {
                tracing::error!(error = %e, "WebSocket connection failed");
                self.close();
                Err(SessionError::Transport(e))
            }
        }
    }

    /// Build the next `accountSubscribe` request and move to `Subscribing`
    ///
    /// Nothing waits here; `handle_ack` matches the reply when it arrives.
    fn subscribe(&mut self) -> Result<String, SessionError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request =
            SubscribeRequest::account(request_id, &self.config.account, self.config.commitment)
                .to_json()?;

        tracing::info!(
            account = %self.config.account,
            commitment = %self.config.commitment,
            request_id,
            "Subscribing to price feed account"
        );
        telemetry::increment(CounterMetric::SubscribeRequests);

        self.state = SessionState::Subscribing { request_id };
        Ok(request)
    }

    async fn handle_text(&mut self, text: &str) {
        if !self.state.accepts_notifications() {
            tracing::trace!(state = %self.state, "Ignoring message before subscription");
            return;
        }

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(
                    preview = %text.chars().take(200).collect::<String>(),
                    "Raw message"
                );
                self.report_parse_error(None, error).await;
                return;
            }
        };

        match message {
            InboundMessage::Ack { id, result } => self.handle_ack(id, &result),
            InboundMessage::Notification(result) => self.handle_notification(result).await,
            InboundMessage::RpcError { id, code, message } => {
                tracing::warn!(id = ?id, code = ?code, %message, "RPC error response");
            }
            InboundMessage::Other => {
                tracing::trace!("Ignoring unrelated message");
            }
        }
    }

    fn handle_ack(&mut self, id: Option<u64>, result: &Value) {
        match self.state {
            SessionState::Subscribing { request_id } if id == Some(request_id) => {
                let subscription_id = subscription_id_string(result);
                tracing::info!(
                    %subscription_id,
                    "Successfully subscribed"
                );
                self.state = SessionState::Streaming { subscription_id };
            }
            _ => {
                tracing::debug!(id = ?id, result = %result, state = %self.state, "Acknowledgement");
            }
        }
    }

    async fn handle_notification(&mut self, result: Value) {
        self.stats.notifications_received += 1;
        telemetry::increment(CounterMetric::NotificationsReceived);

        if !self.gate.admit(self.clock.now_millis()) {
            self.stats.notifications_dropped += 1;
            telemetry::increment(CounterMetric::NotificationsDropped);
            return;
        }
        self.stats.notifications_admitted += 1;
        telemetry::increment(CounterMetric::NotificationsAdmitted);

        let slot = notification_slot(&result);
        let raw = match RawNotification::from_result(result) {
            Ok(raw) => raw,
            Err(error) => {
                self.report_parse_error(slot, error).await;
                return;
            }
        };

        let started = Instant::now();
        let decoded = self.decoder.decode(&raw.data);
        telemetry::record_latency(LatencyMetric::Decode, started.elapsed());

        let event = match decoded {
            Ok(observation) => {
                self.stats.observations += 1;
                telemetry::increment(CounterMetric::Observations);
                telemetry::set_gauge(GaugeMetric::LastPrice, observation.price);
                telemetry::set_gauge(GaugeMetric::LastSlot, raw.slot as f64);
                FeedEvent::Price {
                    slot: raw.slot,
                    observation,
                }
            }
            Err(error) => {
                self.stats.decode_errors += 1;
                telemetry::increment(CounterMetric::DecodeErrors);
                FeedEvent::DecodeFailed {
                    slot: raw.slot,
                    error,
                }
            }
        };

        self.emit(event).await;
    }

    async fn report_parse_error(&mut self, slot: Option<u64>, error: ParseError) {
        self.stats.parse_errors += 1;
        telemetry::increment(CounterMetric::ParseErrors);
        self.emit(FeedEvent::ParseFailed { slot, error }).await;
    }

    async fn emit(&mut self, event: FeedEvent) {
        match self.sink.emit(event).await {
            Ok(()) => {}
            Err(SinkError::Closed) => {
                tracing::info!("Output sink closed");
                self.close();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver feed event");
            }
        }
    }
}
