//! WebSocket transport
//!
//! Duplex text client with ping keepalive and optional bounded backoff.

mod client;
mod types;

pub use client::{WsClient, WsConnection};
pub use types::{ReconnectPolicy, WsConfig, WsError, WsMessage};
