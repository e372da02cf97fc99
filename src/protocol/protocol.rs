//! # Extra HID Protocol Constants and Types
//!
//! Core protocol definitions for the extra HID peripheral.

use crate::error::ExtraHidError;

/// Request ID: configure periodic HID status reports
pub const REQUEST_READ_HID_STATUS: u8 = 0x01;

/// Request ID: read a window of calibration data
pub const REQUEST_READ_CALIBRATION_DATA: u8 = 0x02;

/// Request IDs the hardware reserves but that are not emulated
pub const RESERVED_REQUEST_IDS: [u8; 3] = [0x03, 0x04, 0x05];

/// Response ID: HID status report
pub const RESPONSE_READ_HID_STATUS: u8 = 0x10;

/// Response ID: calibration data
pub const RESPONSE_READ_CALIBRATION_DATA: u8 = 0x11;

/// Status configuration request: id(1) + period(1) + reserved(1)
pub const HID_STATUS_REQUEST_SIZE: usize = 3;

/// Calibration request: id(1) + reserved(1) + offset(2) + size(2)
pub const CALIBRATION_REQUEST_SIZE: usize = 6;

/// HID status response: packed word(4) + buttons(1) + reserved(1)
pub const HID_STATUS_RESPONSE_SIZE: usize = 6;

/// C-stick axis value range (12-bit: 0-4095)
pub const C_STICK_VALUE_MAX: u16 = 0xFFF;
pub const C_STICK_CENTER: u16 = 0x800;

/// Assumed full-deflection radius. The real stick's travel has not been measured,
/// so the whole 12-bit range is used.
pub const C_STICK_RADIUS: u16 = 0x7FF;

/// Battery level field is always reported full
pub const BATTERY_LEVEL_FULL: u8 = 0x1F;

/// Parsed request ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestId {
    ReadHidStatus,
    ReadCalibrationData,
}

impl TryFrom<u8> for RequestId {
    type Error = ExtraHidError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            REQUEST_READ_HID_STATUS => Ok(RequestId::ReadHidStatus),
            REQUEST_READ_CALIBRATION_DATA => Ok(RequestId::ReadCalibrationData),
            id if RESERVED_REQUEST_IDS.contains(&id) => Err(ExtraHidError::UnsupportedRequest(id)),
            id => Err(ExtraHidError::UnknownRequest(id)),
        }
    }
}

/// A fully decoded request packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Start (or restart) periodic status reports every `period_ms` milliseconds
    ReadHidStatus { period_ms: u8 },

    /// Read calibration data. `offset` and `size` are the raw, unaligned values.
    ReadCalibrationData { offset: u16, size: u16 },
}

/// Snapshot of the peripheral inputs carried by one status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidStatus {
    /// C-stick X (12-bit)
    pub c_stick_x: u16,

    /// C-stick Y (12-bit)
    pub c_stick_y: u16,

    /// Battery level (5-bit)
    pub battery: u8,

    /// ZL button pressed
    pub zl_pressed: bool,

    /// ZR button pressed
    pub zr_pressed: bool,

    /// R flag, always set by the hardware
    pub r_flag: bool,
}

impl HidStatus {
    /// Build a status report from sampled input state.
    ///
    /// Axes are normalized (-1.0 to 1.0) and are quantized to 12 bits.
    pub fn from_inputs(stick: (f32, f32), zl_pressed: bool, zr_pressed: bool) -> Self {
        Self {
            c_stick_x: quantize_axis(stick.0),
            c_stick_y: quantize_axis(stick.1),
            battery: BATTERY_LEVEL_FULL,
            zl_pressed,
            zr_pressed,
            r_flag: true,
        }
    }
}

/// Quantize a normalized axis to the 12-bit C-stick range.
///
/// The result is `round(center + radius * axis)` clamped to `0..=0xFFF`, so
/// out-of-range input pins at the edges instead of wrapping into the
/// neighbouring bitfield. NaN reads as centered.
///
/// # Examples
///
/// ```
/// use extra_hid::protocol::protocol::quantize_axis;
///
/// assert_eq!(quantize_axis(0.0), 0x800);
/// assert_eq!(quantize_axis(1.0), 0xFFF);
/// assert_eq!(quantize_axis(-1.0), 0x001);
/// ```
pub fn quantize_axis(axis: f32) -> u16 {
    if axis.is_nan() {
        return C_STICK_CENTER;
    }

    let value = (C_STICK_CENTER as f32 + C_STICK_RADIUS as f32 * axis).round();
    value.clamp(0.0, C_STICK_VALUE_MAX as f32) as u16
}

/// Format bytes as space-separated uppercase hex for log output
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
