//! # Extra HID Protocol Module
//!
//! Wire format of the extra HID peripheral as seen over the infrared channel.
//!
//! This module handles:
//! - Request decoding (status polling configuration, calibration reads)
//! - HID status response encoding (12-bit C-stick axes, ZL/ZR flags)
//! - Calibration data response encoding
//! - The factory calibration blob and its aligned read window

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod calibration;
