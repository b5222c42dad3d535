//! oracle-subscriber: live oracle price feed over an account subscription
//!
//! This library provides the core components for:
//! - Decoding the binary price account layout
//! - Pacing updates with a one-per-interval refractory gate
//! - Running the `accountSubscribe` session over WebSocket
//! - Delivering decoded prices to pluggable output sinks
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod decoder;
pub mod gate;
pub mod session;
pub mod sink;
pub mod telemetry;
pub mod ws;
