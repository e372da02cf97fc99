//! # Error Types
//!
//! Custom error types for the extra HID peripheral using `thiserror`.

use thiserror::Error;

/// Main error type for the extra HID peripheral
#[derive(Debug, Error)]
pub enum ExtraHidError {
    /// Request packet has the wrong shape for its opcode
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// First byte does not name any known request
    #[error("Unknown request ID 0x{0:02X}")]
    UnknownRequest(u8),

    /// Request ID reserved by the hardware but not emulated
    #[error("Unsupported request ID 0x{0:02X}")]
    UnsupportedRequest(u8),

    /// Aligned calibration window runs past the end of the blob
    #[error("Read beyond the end of calibration data (offset={offset}, size={size})")]
    CalibrationOutOfRange { offset: u16, size: u16 },

    /// Status packet could not be decoded
    #[error("Invalid HID status packet: {0}")]
    InvalidStatus(String),

    /// Input source errors
    #[error("Input source error: {0}")]
    Input(String),

    /// Session script errors
    #[error("Session command error: {0}")]
    Command(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the extra HID peripheral
pub type Result<T> = std::result::Result<T, ExtraHidError>;
