//! # Extra HID Packet Encoder
//!
//! Encodes HID status reports and calibration data responses.

use bytes::{BufMut, Bytes, BytesMut};

use super::protocol::*;

/// Encode a HID status report into its 6-byte wire form
///
/// # Arguments
///
/// * `status` - Sampled input state
///
/// # Returns
///
/// * `Bytes` - 6-byte status response
///
/// # Layout
///
/// The first four bytes are one little-endian word, packed LSB first:
/// ```text
/// Word bits 0-7:   response ID (0x10)
/// Word bits 8-19:  C-stick X (12 bits)
/// Word bits 20-31: C-stick Y (12 bits)
/// Byte 4 bits 0-4: battery level
/// Byte 4 bit 5:    ZL released
/// Byte 4 bit 6:    ZR released
/// Byte 4 bit 7:    R flag
/// Byte 5:          reserved (0)
/// ```
///
/// Buttons are active-low: the bit is set when the button is NOT pressed.
///
/// # Examples
///
/// ```
/// use extra_hid::protocol::encoder::encode_hid_status;
/// use extra_hid::protocol::protocol::HidStatus;
///
/// let packet = encode_hid_status(&HidStatus::from_inputs((0.0, 0.0), false, false));
/// assert_eq!(&packet[..], &[0x10, 0x00, 0x08, 0x80, 0xFF, 0x00]);
/// ```
pub fn encode_hid_status(status: &HidStatus) -> Bytes {
    let x = u32::from(status.c_stick_x.min(C_STICK_VALUE_MAX));
    let y = u32::from(status.c_stick_y.min(C_STICK_VALUE_MAX));
    let word = u32::from(RESPONSE_READ_HID_STATUS) | (x << 8) | (y << 20);

    let mut buttons = status.battery & BATTERY_LEVEL_FULL;
    if !status.zl_pressed {
        buttons |= 1 << 5;
    }
    if !status.zr_pressed {
        buttons |= 1 << 6;
    }
    if status.r_flag {
        buttons |= 1 << 7;
    }

    let mut packet = BytesMut::with_capacity(HID_STATUS_RESPONSE_SIZE);
    packet.put_u32_le(word);
    packet.put_u8(buttons);
    packet.put_u8(0);
    packet.freeze()
}

/// Encode a calibration data response
///
/// # Arguments
///
/// * `offset` - Raw offset exactly as received in the request
/// * `size` - Raw size exactly as received in the request
/// * `data` - Calibration window read with the aligned offset and size
///
/// # Returns
///
/// * `Bytes` - Response ID + echoed offset/size + data
pub fn encode_calibration_response(offset: u16, size: u16, data: &[u8]) -> Bytes {
    let mut packet = BytesMut::with_capacity(5 + data.len());
    packet.put_u8(RESPONSE_READ_CALIBRATION_DATA);
    packet.put_u16_le(offset);
    packet.put_u16_le(size);
    packet.put_slice(data);
    packet.freeze()
}
