//! Price account decoder
//!
//! Turns the raw bytes of an oracle price account into a [`PriceObservation`].
//! Layout (little-endian):
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 4    | magic (`0x240ea1ea`)          |
//! | 73     | 8    | raw price, i64, scaled by 1e8 |
//! | 88     | 8    | publish time candidate, u64   |

mod timestamp;
mod types;

pub use timestamp::{recover_publish_time, TimestampError};
pub use types::{DecodeError, PriceObservation, PublishTimeSource};

use crate::config::LayoutConfig;
use byteorder::{ByteOrder, LittleEndian};
use chrono::Utc;
use rust_decimal::Decimal;

/// Ratio of price reported as the confidence band
pub const CONFIDENCE_RATIO: f64 = 0.01;

/// Decoder bound to one account layout
#[derive(Debug, Clone)]
pub struct PriceDecoder {
    layout: LayoutConfig,
}

impl PriceDecoder {
    /// Create a decoder for the given layout
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Decode an account buffer
    ///
    /// Checks run in a fixed order: magic first, then length. A buffer that
    /// fails either check never yields a partial observation.
    pub fn decode(&self, buffer: &[u8]) -> Result<PriceObservation, DecodeError> {
        let magic = self.read_magic(buffer)?;

        if buffer.len() < self.layout.min_len {
            return Err(DecodeError::TooShort {
                len: buffer.len(),
                min_len: self.layout.min_len,
            });
        }

        let offset = self.layout.price_offset;
        let price_bytes = offset
            .checked_add(8)
            .and_then(|end| buffer.get(offset..end))
            .ok_or(DecodeError::TooShort {
                len: buffer.len(),
                min_len: offset.saturating_add(8),
            })?;
        let raw_price = LittleEndian::read_i64(price_bytes);

        let divisor = self.layout.price_divisor.max(1);
        let price = raw_price as f64 / divisor as f64;
        let exact_price = Decimal::from(raw_price) / Decimal::from(divisor);
        let confidence = price * CONFIDENCE_RATIO;

        let (publish_time, time_source) = match recover_publish_time(buffer, &self.layout) {
            Ok(ts) => (ts, PublishTimeSource::Embedded),
            Err(e) => {
                tracing::trace!(reason = %e, "Using local clock as publish time");
                (Utc::now(), PublishTimeSource::LocalClock)
            }
        };

        Ok(PriceObservation {
            price,
            exact_price,
            confidence,
            publish_time,
            time_source,
            raw_price,
            magic,
        })
    }

    fn read_magic(&self, buffer: &[u8]) -> Result<u32, DecodeError> {
        let expected = self.layout.magic;
        let magic = buffer
            .get(..4)
            .map(LittleEndian::read_u32)
            .ok_or(DecodeError::InvalidMagic {
                observed: None,
                expected,
            })?;

        if magic != expected {
            return Err(DecodeError::InvalidMagic {
                observed: Some(magic),
                expected,
            });
        }
        Ok(magic)
    }
}

impl Default for PriceDecoder {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

/// Decode with the default price account layout
pub fn decode(buffer: &[u8]) -> Result<PriceObservation, DecodeError> {
    PriceDecoder::default().decode(buffer)
}
