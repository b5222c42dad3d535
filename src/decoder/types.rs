//! Decoded price types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Where an observation's publish time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishTimeSource {
    /// Recovered from the account payload
    Embedded,
    /// Payload timestamp missing or implausible, local clock used instead
    LocalClock,
}

/// A single decoded price quote
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    /// Scaled price for display
    pub price: f64,
    /// Scaled price without float rounding
    pub exact_price: Decimal,
    /// Placeholder band, 1% of price
    pub confidence: f64,
    pub publish_time: DateTime<Utc>,
    pub time_source: PublishTimeSource,
    /// Unscaled fixed-point price, serialized as a decimal string
    #[serde(serialize_with = "serialize_as_string")]
    pub raw_price: i64,
    /// Layout tag, serialized as `0x`-prefixed hex
    #[serde(serialize_with = "serialize_as_hex")]
    pub magic: u32,
}

impl PriceObservation {
    pub fn magic_hex(&self) -> String {
        format!("0x{:x}", self.magic)
    }
}

fn serialize_as_string<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_as_hex<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{:x}", value))
}

/// Reasons an account payload cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid magic number: {} (expected 0x{expected:x})", describe_magic(.observed))]
    InvalidMagic { observed: Option<u32>, expected: u32 },

    #[error("Buffer too small to contain price data: {len} < {min_len} bytes")]
    TooShort { len: usize, min_len: usize },
}

fn describe_magic(observed: &Option<u32>) -> String {
    match observed {
        Some(magic) => format!("0x{:x}", magic),
        None => "missing".to_string(),
    }
}
