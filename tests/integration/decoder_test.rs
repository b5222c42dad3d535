//! Integration tests for the price account decoder

use chrono::Utc;
use oracle_subscriber::decoder::{decode, DecodeError, PublishTimeSource};

const MAGIC: u32 = 0x240e_a1ea;

fn account(len: usize, raw_price: i64, timestamp: Option<u64>) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    buf[..4].copy_from_slice(&MAGIC.to_le_bytes());
    if len >= 81 {
        buf[73..81].copy_from_slice(&raw_price.to_le_bytes());
    }
    if let Some(ts) = timestamp {
        buf[88..96].copy_from_slice(&ts.to_le_bytes());
    }
    buf
}

#[test]
fn test_mismatched_magic_never_decodes() {
    for first in [0x00u8, 0x01, 0xe9, 0xeb, 0xff] {
        let mut buf = account(96, 1, None);
        buf[0] = first;
        let err = decode(&buf).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidMagic {
                observed: Some(u32::from_le_bytes([first, 0xa1, 0x0e, 0x24])),
                expected: MAGIC,
            }
        );
    }
}

#[test]
fn test_short_buffers_with_magic_are_too_short() {
    for len in 4..81 {
        let err = decode(&account(len, 0, None)).unwrap_err();
        assert_eq!(err, DecodeError::TooShort { len, min_len: 81 });
    }
}

#[test]
fn test_raw_price_is_le_i64_at_73() {
    for raw in [0i64, 1, -1, 99_999_999, 6_512_345_678_900, i64::MIN, i64::MAX] {
        for len in [81, 88, 96, 200] {
            let obs = decode(&account(len, raw, None)).unwrap();
            assert_eq!(obs.raw_price, raw);
            let expected = raw as f64 / 1e8;
            assert!((obs.price - expected).abs() <= expected.abs() * 1e-12);
        }
    }
}

#[test]
fn test_synthetic_round_trip_uses_local_clock() {
    let raw = 6_512_345_678_900i64;
    let before = Utc::now();
    let obs = decode(&account(81, raw, None)).unwrap();
    let after = Utc::now();

    assert_eq!(obs.price, raw as f64 / 1e8);
    assert_eq!(obs.confidence, obs.price * 0.01);
    assert_eq!(obs.time_source, PublishTimeSource::LocalClock);
    assert!(obs.publish_time >= before && obs.publish_time <= after);
}

#[test]
fn test_timestamp_plausibility() {
    // 2024-06-01T12:00:00Z in microseconds
    let obs = decode(&account(96, 1, Some(1_717_243_200_000_000))).unwrap();
    assert_eq!(obs.time_source, PublishTimeSource::Embedded);
    assert_eq!(obs.publish_time.to_rfc3339(), "2024-06-01T12:00:00+00:00");

    for implausible in [0u64, 86_400_000_000, 4_070_908_800_000_000] {
        let before = Utc::now();
        let obs = decode(&account(96, 1, Some(implausible))).unwrap();
        assert_eq!(obs.time_source, PublishTimeSource::LocalClock);
        assert!(obs.publish_time >= before);
    }
}

#[test]
fn test_scenario_payload_serialization() {
    let obs = decode(&account(96, 10_000_000_000, None)).unwrap();
    let json = serde_json::to_value(&obs).unwrap();
    assert_eq!(json["price"], 100.0);
    assert_eq!(json["confidence"], 1.0);
    assert_eq!(json["rawPrice"], "10000000000");
    assert_eq!(json["magic"], "0x240ea1ea");
}
