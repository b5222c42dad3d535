//! Publish time recovery
//!
//! The price account has no documented timestamp field. A u64 at a fixed offset
//! often holds a microsecond epoch value; it is used only when it lands in a
//! plausible calendar window.

use crate::config::LayoutConfig;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use thiserror::Error;

/// Why a payload timestamp was not used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("buffer of {len} bytes has no timestamp field")]
    Missing { len: usize },

    #[error("timestamp value {raw} is outside the representable range")]
    OutOfRange { raw: u64 },

    #[error("timestamp year {year} is outside the plausible window")]
    Implausible { year: i32 },
}

/// Read the candidate publish time from `buffer`
pub fn recover_publish_time(
    buffer: &[u8],
    layout: &LayoutConfig,
) -> Result<DateTime<Utc>, TimestampError> {
    let start = layout.timestamp_offset;
    let bytes = start
        .checked_add(8)
        .and_then(|end| buffer.get(start..end))
        .ok_or(TimestampError::Missing { len: buffer.len() })?;

    let raw = LittleEndian::read_u64(bytes);
    let millis = i64::try_from(raw / layout.timestamp_divisor.max(1))
        .map_err(|_| TimestampError::OutOfRange { raw })?;
    let timestamp = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or(TimestampError::OutOfRange { raw })?;

    let year = timestamp.year();
    if year < layout.min_plausible_year || year > layout.max_plausible_year {
        return Err(TimestampError::Implausible { year });
    }

    Ok(timestamp)
}
