//! # Calibration Data Module
//!
//! Factory calibration blob reported by the peripheral.
//!
//! The blob is 64 bytes and is only readable in 16-byte aligned windows:
//! both the requested offset and size are rounded down to a multiple of 16
//! before the bounds check. A window that runs past the end of the blob is
//! rejected as a whole; there are no partial reads.
//!
//! ## Usage
//!
//! ```
//! use extra_hid::protocol::calibration::CalibrationData;
//!
//! let cal = CalibrationData::factory();
//!
//! // 0x13 / 0x1F align down to 0x10 / 0x10
//! assert_eq!(cal.read(0x13, 0x1F).unwrap().len(), 16);
//!
//! // 0x30 + 0x20 runs past the end
//! assert!(cal.read(0x30, 0x20).is_err());
//! ```

use crate::error::{ExtraHidError, Result};

/// Calibration blob size in bytes
pub const CALIBRATION_DATA_SIZE: usize = 0x40;

/// Read window alignment in bytes
pub const CALIBRATION_ALIGNMENT: u16 = 16;

/// Calibration values dumped from real hardware
const FACTORY_CALIBRATION: [u8; CALIBRATION_DATA_SIZE] = [
    // 0x00
    0x00, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F,
    // 0x08
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0xF5,
    // 0x10
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F,
    // 0x18
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65,
    // 0x20
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F,
    // 0x28
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65,
    // 0x30
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F,
    // 0x38
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65,
];

/// Read-only calibration blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationData {
    data: [u8; CALIBRATION_DATA_SIZE],
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self::factory()
    }
}

impl CalibrationData {
    /// Calibration blob with the factory values.
    #[must_use]
    pub fn factory() -> Self {
        Self {
            data: FACTORY_CALIBRATION,
        }
    }

    /// Full blob contents.
    pub fn as_bytes(&self) -> &[u8; CALIBRATION_DATA_SIZE] {
        &self.data
    }

    /// Read an aligned window of the blob
    ///
    /// # Arguments
    ///
    /// * `offset` - Raw requested offset (rounded down to 16)
    /// * `size` - Raw requested size (rounded down to 16)
    ///
    /// # Returns
    ///
    /// * `Result<&[u8]>` - Exactly `size` bytes starting at `offset`, after alignment
    ///
    /// # Errors
    ///
    /// Returns `CalibrationOutOfRange` with the aligned values if the window
    /// ends past the blob.
    pub fn read(&self, offset: u16, size: u16) -> Result<&[u8]> {
        let offset = align_down(offset);
        let size = align_down(size);

        let start = usize::from(offset);
        let end = start + usize::from(size);
        if end > CALIBRATION_DATA_SIZE {
            return Err(ExtraHidError::CalibrationOutOfRange { offset, size });
        }

        Ok(&self.data[start..end])
    }
}

/// Round down to the calibration window alignment
#[inline]
fn align_down(value: u16) -> u16 {
    value & !(CALIBRATION_ALIGNMENT - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_size() {
        let cal = CalibrationData::factory();
        assert_eq!(cal.as_bytes().len(), 64);
        assert_eq!(cal, CalibrationData::default());
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(0), 0);
        assert_eq!(align_down(15), 0);
        assert_eq!(align_down(16), 16);
        assert_eq!(align_down(0x1F), 0x10);
        assert_eq!(align_down(0xFFFF), 0xFFF0);
    }

    #[test]
    fn test_read_full_blob() {
        let cal = CalibrationData::factory();
        let data = cal.read(0, 0x40).unwrap();
        assert_eq!(data, &FACTORY_CALIBRATION[..]);
    }

    #[test]
    fn test_read_window() {
        let cal = CalibrationData::factory();
        let data = cal.read(0x10, 0x10).unwrap();
        assert_eq!(data, &FACTORY_CALIBRATION[0x10..0x20]);
        assert_eq!(data[0], 0xFF);
        assert_eq!(data[15], 0x65);
    }

    #[test]
    fn test_read_unaligned_is_rounded_down() {
        let cal = CalibrationData::factory();
        let data = cal.read(0x0F, 0x2F).unwrap();
        assert_eq!(data, &FACTORY_CALIBRATION[0x00..0x20]);
    }

    #[test]
    fn test_read_last_window() {
        let cal = CalibrationData::factory();
        let data = cal.read(0x30, 0x10).unwrap();
        assert_eq!(data, &FACTORY_CALIBRATION[0x30..0x40]);
    }

    #[test]
    fn test_read_zero_size() {
        let cal = CalibrationData::factory();
        assert!(cal.read(0x20, 0x0F).unwrap().is_empty());
        assert!(cal.read(0x40, 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_past_end() {
        let cal = CalibrationData::factory();

        match cal.read(0x30, 0x20) {
            Err(ExtraHidError::CalibrationOutOfRange { offset, size }) => {
                assert_eq!(offset, 0x30);
                assert_eq!(size, 0x20);
            }
            other => panic!("Expected CalibrationOutOfRange, got: {:?}", other),
        }
    }

    #[test]
    fn test_read_past_end_reports_aligned_values() {
        let cal = CalibrationData::factory();

        match cal.read(0x5F, 0x0F) {
            Err(ExtraHidError::CalibrationOutOfRange { offset, size }) => {
                assert_eq!(offset, 0x50);
                assert_eq!(size, 0x00);
            }
            other => panic!("Expected CalibrationOutOfRange, got: {:?}", other),
        }
    }

    #[test]
    fn test_read_huge_values_do_not_overflow() {
        let cal = CalibrationData::factory();
        assert!(cal.read(0xFFFF, 0xFFFF).is_err());
    }
}
