//! Decoding of Cycling Power Measurement notifications.
//!
//! ```text
//! offset  size  field
//! 0       2     flags (u16 LE, ignored)
//! 2       2     instantaneous power in watts (u16 LE)
//! 4..     -     flag dependent fields (ignored)
//! ```

use std::fmt;
use std::time::SystemTime;

use crate::error::DecodeError;

const POWER_OFFSET: usize = 2;
const MIN_LEN: usize = 4;

/// A single decoded power sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerReading {
    pub instantaneous_power_watts: u16,
    /// When the notification was captured.
    pub timestamp: SystemTime,
}

impl fmt::Display for PowerReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} W", self.instantaneous_power_watts)
    }
}

/// Decode a measurement payload, stamping it with the current time.
pub fn decode(payload: &[u8]) -> Result<PowerReading, DecodeError> {
    decode_at(payload, SystemTime::now())
}

/// Decode a measurement payload captured at `timestamp`.
pub fn decode_at(payload: &[u8], timestamp: SystemTime) -> Result<PowerReading, DecodeError> {
    let power = payload
        .get(POWER_OFFSET..MIN_LEN)
        .ok_or(DecodeError::TooShort { len: payload.len() })?;

    Ok(PowerReading {
        instantaneous_power_watts: u16::from_le_bytes([power[0], power[1]]),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reads_power_little_endian() {
        let reading = decode(&[0x00, 0x00, 0xC8, 0x00]).unwrap();
        assert_eq!(reading.instantaneous_power_watts, 200);

        let reading = decode(&[0x00, 0x00, 0x34, 0x12]).unwrap();
        assert_eq!(reading.instantaneous_power_watts, 0x1234);
    }

    #[test]
    fn flags_and_trailing_fields_are_ignored() {
        for flags in [[0x00, 0x00], [0xFF, 0xFF], [0x20, 0x01]] {
            let payload = [flags[0], flags[1], 0x2C, 0x01, 0xAA, 0xBB, 0xCC];
            assert_eq!(decode(&payload).unwrap().instantaneous_power_watts, 300);
        }
    }

    #[test]
    fn short_payload_is_rejected() {
        for len in 0..MIN_LEN {
            let payload = vec![0xFF; len];
            assert_eq!(decode(&payload), Err(DecodeError::TooShort { len }));
        }
    }

    #[test]
    fn decode_at_is_deterministic() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let payload = [0x01, 0x00, 0xFF, 0xFF];

        assert_eq!(decode_at(&payload, at), decode_at(&payload, at));
        assert_eq!(decode_at(&payload, at).unwrap().instantaneous_power_watts, u16::MAX);
        assert_eq!(decode_at(&payload, at).unwrap().timestamp, at);
    }

    #[test]
    fn displays_watts() {
        let reading = decode(&[0x00, 0x00, 0xFA, 0x00]).unwrap();
        assert_eq!(reading.to_string(), "250 W");
    }
}
