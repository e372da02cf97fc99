//! # evdev Input Engine
//!
//! Reads buttons and sticks directly from Linux input devices.
//!
//! ## Descriptors
//!
//! | Source | Descriptor |
//! |--------|------------|
//! | Button | `engine:evdev,path:/dev/input/event3,code:312` |
//! | Stick  | `engine:evdev,path:/dev/input/event3,axis_x:3,axis_y:4,invert_y:true` |
//!
//! `code` is an `EV_KEY` code (312 = `BTN_TL2`), `axis_x`/`axis_y` are
//! `EV_ABS` codes (3 = `ABS_RX`, 4 = `ABS_RY`). Codes may be written in
//! decimal or `0x` hex.
//!
//! State is queried from the kernel on every read, so no event loop is
//! needed. Axis values are normalized from the range the device reports
//! (`ABS_*` min/max) to -1.0..=1.0. Most pads report Y growing downwards;
//! set `invert_y:true` to make up positive.

use evdev::{AbsoluteAxisType, Device, Key};
use tracing::{debug, info};

use super::param::ParamPackage;
use super::{AnalogDevice, ButtonDevice, InputEngine};
use crate::error::{ExtraHidError, Result};

/// Number of absolute axis slots reported by the kernel
const ABS_AXIS_COUNT: u16 = 0x40;

/// Engine creating sources from `/dev/input/event*` devices
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevInput;

impl EvdevInput {
    pub fn new() -> Self {
        Self
    }
}

fn open_device(path: &str) -> Result<Device> {
    let device = Device::open(path)
        .map_err(|e| ExtraHidError::Input(format!("Failed to open {}: {}", path, e)))?;

    let id = device.input_id();
    debug!(
        "Opened input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
        path,
        id.vendor(),
        id.product()
    );
    Ok(device)
}

fn abs_axis(params: &ParamPackage, key: &str) -> Result<AbsoluteAxisType> {
    let code = params.require_u16(key)?;
    if code >= ABS_AXIS_COUNT {
        return Err(ExtraHidError::Input(format!(
            "Axis code {} for '{}' is out of range (must be below {})",
            code, key, ABS_AXIS_COUNT
        )));
    }
    Ok(AbsoluteAxisType(code))
}

/// Map a raw axis value from `minimum..=maximum` to -1.0..=1.0
///
/// Degenerate ranges read as centered.
///
/// # Examples
///
/// ```
/// use extra_hid::input::evdev_input::normalize_axis;
///
/// assert_eq!(normalize_axis(0, 0, 255), -1.0);
/// assert_eq!(normalize_axis(255, 0, 255), 1.0);
/// assert!(normalize_axis(0, -32768, 32767).abs() < 0.001);
/// ```
pub fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }

    let span = f64::from(maximum) - f64::from(minimum);
    let position = (f64::from(value) - f64::from(minimum)) / span;
    ((position * 2.0 - 1.0) as f32).clamp(-1.0, 1.0)
}

/// Button read from a key code
pub struct EvdevButton {
    device: Device,
    key: Key,
    path: String,
}

impl std::fmt::Debug for EvdevButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevButton")
            .field("path", &self.path)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl ButtonDevice for EvdevButton {
    fn is_pressed(&self) -> bool {
        match self.device.get_key_state() {
            Ok(keys) => keys.contains(self.key),
            Err(e) => {
                debug!("Failed to read key state from {}: {}", self.path, e);
                false
            }
        }
    }
}

/// Stick read from two absolute axes
pub struct EvdevAnalog {
    device: Device,
    axis_x: AbsoluteAxisType,
    axis_y: AbsoluteAxisType,
    invert_y: bool,
    path: String,
}

impl std::fmt::Debug for EvdevAnalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevAnalog")
            .field("path", &self.path)
            .field("axis_x", &self.axis_x)
            .field("axis_y", &self.axis_y)
            .field("invert_y", &self.invert_y)
            .finish_non_exhaustive()
    }
}

impl AnalogDevice for EvdevAnalog {
    fn status(&self) -> (f32, f32) {
        let state = match self.device.get_abs_state() {
            Ok(state) => state,
            Err(e) => {
                debug!("Failed to read axis state from {}: {}", self.path, e);
                return (0.0, 0.0);
            }
        };

        let read = |axis: AbsoluteAxisType| {
            state
                .get(usize::from(axis.0))
                .map_or(0.0, |info| normalize_axis(info.value, info.minimum, info.maximum))
        };

        let x = read(self.axis_x);
        let y = read(self.axis_y);
        (x, if self.invert_y { -y } else { y })
    }
}

impl InputEngine for EvdevInput {
    fn create_button(&self, params: &ParamPackage) -> Result<Box<dyn ButtonDevice>> {
        let path = params.require("path")?;
        let key = Key::new(params.require_u16("code")?);
        let device = open_device(path)?;

        let supported = device
            .supported_keys()
            .map_or(false, |keys| keys.contains(key));
        if !supported {
            return Err(ExtraHidError::Input(format!("{} does not report key {:?}", path, key)));
        }

        info!("Using {:?} on {} as button source", key, path);
        Ok(Box::new(EvdevButton {
            device,
            key,
            path: path.to_string(),
        }))
    }

    fn create_analog(&self, params: &ParamPackage) -> Result<Box<dyn AnalogDevice>> {
        let path = params.require("path")?;
        let axis_x = abs_axis(params, "axis_x")?;
        let axis_y = abs_axis(params, "axis_y")?;
        let invert_y = params.get_bool("invert_y", false);
        let device = open_device(path)?;

        let supported = device.supported_absolute_axes().map_or(false, |axes| {
            axes.contains(axis_x) && axes.contains(axis_y)
        });
        if !supported {
            return Err(ExtraHidError::Input(format!(
                "{} does not report axes {:?}/{:?}",
                path, axis_x, axis_y
            )));
        }

        info!("Using {:?}/{:?} on {} as analog source", axis_x, axis_y, path);
        Ok(Box::new(EvdevAnalog {
            device,
            axis_x,
            axis_y,
            invert_y,
            path: path.to_string(),
        }))
    }
}
