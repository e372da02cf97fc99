//! # Extra HID Packet Decoder
//!
//! Decodes inbound request packets, plus HID status reports for host-side tooling.

use bytes::Buf;

use super::protocol::*;
use crate::error::{ExtraHidError, Result};

/// Decode a complete request packet
///
/// # Arguments
///
/// * `data` - Whole request packet as delivered by the transport
///
/// # Returns
///
/// * `Result<Request>` - Decoded request, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Packet is empty
/// - Request ID is unknown or reserved
/// - Packet length does not match the request ID
pub fn decode_request(data: &[u8]) -> Result<Request> {
    let Some(&id) = data.first() else {
        return Err(ExtraHidError::MalformedRequest("Empty request".to_string()));
    };

    match RequestId::try_from(id)? {
        RequestId::ReadHidStatus => decode_hid_status_request(data),
        RequestId::ReadCalibrationData => decode_calibration_request(data),
    }
}

/// Decode a status polling configuration request (3 bytes)
pub fn decode_hid_status_request(data: &[u8]) -> Result<Request> {
    if data.len() != HID_STATUS_REQUEST_SIZE {
        return Err(ExtraHidError::MalformedRequest(
            format!("Wrong request size ({}): {}", data.len(), hex_string(data))
        ));
    }

    Ok(Request::ReadHidStatus { period_ms: data[1] })
}

/// Decode a calibration data request (6 bytes)
///
/// Offset and size are little-endian and returned unaligned.
pub fn decode_calibration_request(data: &[u8]) -> Result<Request> {
    if data.len() != CALIBRATION_REQUEST_SIZE {
        return Err(ExtraHidError::MalformedRequest(
            format!("Wrong request size ({}): {}", data.len(), hex_string(data))
        ));
    }

    // Skip request ID and reserved byte
    let mut buf = &data[2..];
    let offset = buf.get_u16_le();
    let size = buf.get_u16_le();

    Ok(Request::ReadCalibrationData { offset, size })
}

/// Decode a HID status report
///
/// # Arguments
///
/// * `data` - Status response (6 bytes)
///
/// # Returns
///
/// * `Result<HidStatus>` - Decoded status
///
/// # Errors
///
/// Returns error if the length or response ID is wrong
pub fn decode_hid_status(data: &[u8]) -> Result<HidStatus> {
    if data.len() != HID_STATUS_RESPONSE_SIZE {
        return Err(ExtraHidError::InvalidStatus(
            format!("Wrong status size ({}): {}", data.len(), hex_string(data))
        ));
    }

    let mut buf = data;
    let word = buf.get_u32_le();
    let buttons = buf.get_u8();

    let id = (word & 0xFF) as u8;
    if id != RESPONSE_READ_HID_STATUS {
        return Err(ExtraHidError::InvalidStatus(
            format!("Unexpected response ID: 0x{:02X}", id)
        ));
    }

    Ok(HidStatus {
        c_stick_x: ((word >> 8) & 0xFFF) as u16,
        c_stick_y: ((word >> 20) & 0xFFF) as u16,
        battery: buttons & BATTERY_LEVEL_FULL,
        zl_pressed: buttons & (1 << 5) == 0,
        zr_pressed: buttons & (1 << 6) == 0,
        r_flag: buttons & (1 << 7) != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode_hid_status;

    #[test]
    fn test_decode_empty_request() {
        let result = decode_request(&[]);
        assert!(matches!(result, Err(ExtraHidError::MalformedRequest(_))));
    }

    #[test]
    fn test_decode_hid_status_request() {
        let request = decode_request(&[0x01, 0x05, 0x00]).unwrap();
        assert_eq!(request, Request::ReadHidStatus { period_ms: 5 });
    }

    #[test]
    fn test_decode_hid_status_request_full_period_range() {
        assert_eq!(
            decode_request(&[0x01, 0x00, 0x00]).unwrap(),
            Request::ReadHidStatus { period_ms: 0 }
        );
        assert_eq!(
            decode_request(&[0x01, 0xFF, 0xAA]).unwrap(),
            Request::ReadHidStatus { period_ms: 255 }
        );
    }

    #[test]
    fn test_decode_hid_status_request_wrong_size() {
        assert!(matches!(
            decode_request(&[0x01, 0x05]),
            Err(ExtraHidError::MalformedRequest(_))
        ));
        assert!(matches!(
            decode_request(&[0x01, 0x05, 0x00, 0x00]),
            Err(ExtraHidError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_decode_wrong_size_message_contains_bytes() {
        match decode_request(&[0x01, 0x05]) {
            Err(ExtraHidError::MalformedRequest(msg)) => {
                assert!(msg.contains("(2)"));
                assert!(msg.contains("01 05"));
            }
            other => panic!("Expected MalformedRequest, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_calibration_request() {
        let request = decode_request(&[0x02, 0x00, 0x10, 0x00, 0x20, 0x00]).unwrap();
        assert_eq!(request, Request::ReadCalibrationData { offset: 0x10, size: 0x20 });
    }

    #[test]
    fn test_decode_calibration_request_little_endian() {
        let request = decode_request(&[0x02, 0xFF, 0x34, 0x12, 0x78, 0x56]).unwrap();
        assert_eq!(request, Request::ReadCalibrationData { offset: 0x1234, size: 0x5678 });
    }

    #[test]
    fn test_decode_calibration_request_wrong_size() {
        assert!(decode_request(&[0x02, 0x00, 0x10, 0x00, 0x10]).is_err());
        assert!(decode_request(&[0x02, 0x00, 0x10, 0x00, 0x10, 0x00, 0x00]).is_err());
        assert!(decode_request(&[0x02]).is_err());
    }

    #[test]
    fn test_decode_unknown_and_reserved_requests() {
        assert!(matches!(decode_request(&[0x07, 0x00]), Err(ExtraHidError::UnknownRequest(0x07))));
        assert!(matches!(decode_request(&[0x03]), Err(ExtraHidError::UnsupportedRequest(0x03))));
        assert!(matches!(decode_request(&[0x05, 0x00, 0x00]), Err(ExtraHidError::UnsupportedRequest(0x05))));
    }

    #[test]
    fn test_decode_hid_status_centered() {
        let packet = encode_hid_status(&HidStatus::from_inputs((0.0, 0.0), false, false));
        let status = decode_hid_status(&packet).unwrap();

        assert_eq!(status.c_stick_x, 0x800);
        assert_eq!(status.c_stick_y, 0x800);
        assert_eq!(status.battery, 0x1F);
        assert!(!status.zl_pressed);
        assert!(!status.zr_pressed);
        assert!(status.r_flag);
    }

    #[test]
    fn test_decode_hid_status_full_deflection() {
        let packet = encode_hid_status(&HidStatus::from_inputs((1.0, -1.0), true, false));
        let status = decode_hid_status(&packet).unwrap();

        assert_eq!(status.c_stick_x, 0x800 + 0x7FF);
        assert_eq!(status.c_stick_y, 0x800 - 0x7FF);
        assert!(status.zl_pressed);
        assert!(!status.zr_pressed);
    }

    #[test]
    fn test_decode_hid_status_fixed_bytes() {
        let status = decode_hid_status(&[0x10, 0xBC, 0x3A, 0x12, 0x5F, 0x00]).unwrap();

        assert_eq!(status.c_stick_x, 0xABC);
        assert_eq!(status.c_stick_y, 0x123);
        assert_eq!(status.battery, 0x1F);
        // 0x5F: bit 5 clear (ZL pressed), bit 6 set (ZR released), bit 7 clear
        assert!(status.zl_pressed);
        assert!(!status.zr_pressed);
        assert!(!status.r_flag);
    }

    #[test]
    fn test_decode_hid_status_invalid() {
        assert!(decode_hid_status(&[0x10, 0x00, 0x08, 0x80, 0xFF]).is_err());
        assert!(decode_hid_status(&[0x11, 0x00, 0x08, 0x80, 0xFF, 0x00]).is_err());
    }
}
