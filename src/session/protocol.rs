//! JSON-RPC envelopes for `accountSubscribe`

use crate::config::Commitment;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Encoding requested for account data
pub const ACCOUNT_DATA_ENCODING: &str = "base64";

const SUBSCRIBE_METHOD: &str = "accountSubscribe";

/// Reasons an inbound message could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unexpected message envelope: {0}")]
    Envelope(String),

    #[error("Malformed account notification: {0}")]
    Notification(String),

    #[error("Unsupported account data encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid base64 account data: {0}")]
    Base64(String),

    #[error("Binary frame is not valid UTF-8")]
    NonUtf8,
}

/// `accountSubscribe` request
#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    jsonrpc: &'static str,
    pub id: u64,
    method: &'static str,
    params: (&'a str, SubscribeOptions),
}

#[derive(Debug, Serialize)]
struct SubscribeOptions {
    encoding: &'static str,
    commitment: Commitment,
}

impl<'a> SubscribeRequest<'a> {
    pub fn account(id: u64, account: &'a str, commitment: Commitment) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: SUBSCRIBE_METHOD,
            params: (
                account,
                SubscribeOptions {
                    encoding: ACCOUNT_DATA_ENCODING,
                    commitment,
                },
            ),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Response carrying a `result`, e.g. the subscription id
    Ack { id: Option<u64>, result: Value },
    /// Push notification; holds `params.result`
    Notification(Value),
    /// JSON-RPC error response
    RpcError {
        id: Option<u64>,
        code: Option<i64>,
        message: String,
    },
    /// Valid envelope the feed has no use for
    Other,
}

impl InboundMessage {
    /// Parse and classify a text frame
    ///
    /// A present `result` key makes the message an acknowledgement, even when
    /// its value is null. Otherwise a present `params.result` makes it a
    /// notification.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

        let Value::Object(mut envelope) = value else {
            return Err(ParseError::Envelope(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let id = envelope.get("id").and_then(Value::as_u64);

        if let Some(result) = envelope.remove("result") {
            return Ok(InboundMessage::Ack { id, result });
        }

        if let Some(result) = envelope
            .get_mut("params")
            .and_then(Value::as_object_mut)
            .and_then(|params| params.remove("result"))
        {
            return Ok(InboundMessage::Notification(result));
        }

        if let Some(error) = envelope.get("error") {
            return Ok(InboundMessage::RpcError {
                id,
                code: error.get("code").and_then(Value::as_i64),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        Ok(InboundMessage::Other)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a subscription id for diagnostics
pub fn subscription_id_string(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Account bytes and slot carried by one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub slot: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct NotificationResult {
    context: NotificationContext,
    value: AccountValue,
}

#[derive(Debug, Deserialize)]
struct NotificationContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    /// `[payload, encoding]`
    data: (String, String),
}

impl RawNotification {
    /// Extract slot and account bytes from `params.result`
    pub fn from_result(result: Value) -> Result<Self, ParseError> {
        let parsed: NotificationResult = serde_json::from_value(result)
            .map_err(|e| ParseError::Notification(e.to_string()))?;

        let (payload, encoding) = parsed.value.data;
        if encoding != ACCOUNT_DATA_ENCODING {
            return Err(ParseError::UnsupportedEncoding(encoding));
        }

        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| ParseError::Base64(e.to_string()))?;

        Ok(Self {
            slot: parsed.context.slot,
            data,
        })
    }
}

/// Best-effort slot lookup used to tag notification errors
pub fn notification_slot(result: &Value) -> Option<u64> {
    result.pointer("/context/slot").and_then(Value::as_u64)
}
