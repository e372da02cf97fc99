//! # Extra HID Library
//!
//! Emulation of the infrared "extra HID" peripheral: a second analog stick
//! (the C-stick) plus the ZL and ZR buttons.
//!
//! This library provides the request dispatcher, the wire codec, calibration
//! data reads and the periodic HID status broadcast with drift correction,
//! behind injected scheduler, transport and input seams.

pub mod config;
pub mod device;
pub mod error;
pub mod input;
pub mod protocol;
pub mod session;
pub mod timing;
pub mod transport;
