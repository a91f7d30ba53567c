//! # Telemetry Packet Decoder
//!
//! Decodes the phone client's comma-separated UDP payload into a vector of
//! normalized readings.
//!
//! ## Wire Format
//!
//! ```text
//! <pad>,<reserved>,<ax0>,<ax1>,<ax2>,<ax3>,<ax4>,<ax5>[,<extra>...],<pad>
//! ```
//!
//! The first and last fields are padding. The second field is reserved by the
//! client and is always discarded.

use super::calibration::{calibrate, CALIBRATED_CHANNELS};
use crate::error::{BridgeError, Result};

/// Field delimiter of the wire format
pub const FIELD_DELIMITER: u8 = b',';

/// Minimum number of numeric fields after padding and reserved field are stripped
pub const MIN_READINGS: usize = CALIBRATED_CHANNELS;

/// Decode a raw telemetry packet
///
/// # Arguments
///
/// * `packet` - Raw UDP payload
///
/// # Returns
///
/// * `Result<Vec<f32>>` - Calibrated readings, channel order preserved
///
/// # Errors
///
/// Returns `MalformedPacket` if:
/// - Payload is not valid UTF-8
/// - Any reading is not a number
/// - Fewer than 6 readings remain after stripping
///
/// # Examples
///
/// ```
/// use yoke_bridge::telemetry::decoder::decode;
///
/// let readings = decode(b",0,0,5.1012,0.5,0.5,1,0,")?;
/// assert_eq!(readings.len(), 6);
/// assert_eq!(readings[4], 1.0);
/// # Ok::<(), yoke_bridge::error::BridgeError>(())
/// ```
pub fn decode(packet: &[u8]) -> Result<Vec<f32>> {
    let text = std::str::from_utf8(packet)
        .map_err(|e| BridgeError::MalformedPacket(format!("Payload is not UTF-8: {}", e)))?;

    let fields: Vec<&str> = text.split(FIELD_DELIMITER as char).collect();

    // pad + reserved + pad must surround the readings
    if fields.len() < MIN_READINGS + 3 {
        return Err(BridgeError::MalformedPacket(format!(
            "Expected at least {} readings, got {}",
            MIN_READINGS,
            fields.len().saturating_sub(3)
        )));
    }

    let readings = &fields[2..fields.len() - 1];

    readings
        .iter()
        .enumerate()
        .map(|(channel, field)| {
            let raw: f64 = field.trim().parse().map_err(|_| {
                BridgeError::MalformedPacket(format!(
                    "Channel {} is not a number: {:?}",
                    channel, field
                ))
            })?;
            Ok(calibrate(channel, raw) as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_decode_calibration_example() {
        let readings = decode(b"x,0,9.81,5.1012,0.5,0.5,0.5,0.5,x").unwrap();

        assert_eq!(readings.len(), 6);
        assert_close(readings[0], 1.5);
        assert_close(readings[1], 0.0);
        for &value in &readings[2..] {
            assert_close(value, 0.0);
        }
    }

    #[test]
    fn test_decode_calibrates_in_double_precision() {
        let readings = decode(b",0,0,5.1012,0,0,0,0,").unwrap();

        let expected = ((5.1012_f64 / 9.81 - 0.52) * 3.0) as f32;
        assert_eq!(readings[1].to_bits(), expected.to_bits());
    }

    #[test]
    fn test_decode_passes_extra_channels_through() {
        let readings = decode(b",0,0,0,0,0,0,0,1,0.25,-3,").unwrap();

        assert_eq!(readings.len(), 9);
        assert_eq!(&readings[6..], &[1.0, 0.25, -3.0]);
    }

    #[test]
    fn test_decode_ignores_reserved_field_content() {
        let a = decode(b",17,1,2,0,1,0,1,").unwrap();
        let b = decode(b",not-a-number,1,2,0,1,0,1,").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_ignores_padding_content() {
        let a = decode(b"garbage,0,1,2,0,1,0,1,trailing").unwrap();
        let b = decode(b",0,1,2,0,1,0,1,").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let packet = b",0,3.3,-4.7,0.1,0.9,0.33,0.66,0.5,";
        let first = decode(packet).unwrap();
        let second = decode(packet).unwrap();

        let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let readings = decode(b", 0, 0 ,0,1 ,1,1, 1 ,\n").unwrap();
        assert_eq!(readings.len(), 6);
        assert_eq!(readings[5], 1.0);
    }

    #[test]
    fn test_decode_too_few_readings() {
        let result = decode(b",0,1,2,3,4,5,");
        match result {
            Err(BridgeError::MalformedPacket(msg)) => assert!(msg.contains("at least 6")),
            other => panic!("Expected MalformedPacket, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_packet() {
        assert!(matches!(decode(b""), Err(BridgeError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_non_numeric_reading() {
        let result = decode(b",0,1,2,three,4,5,6,");
        match result {
            Err(BridgeError::MalformedPacket(msg)) => assert!(msg.contains("Channel 2")),
            other => panic!("Expected MalformedPacket, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_reading_field() {
        assert_err!(decode(b",0,1,,3,4,5,6,"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let packet = [b',', b'0', b',', 0xFF, 0xFE, b',', b'1'];
        assert!(matches!(decode(&packet), Err(BridgeError::MalformedPacket(_))));
    }
}
