//! # Input Module
//!
//! Live input sources sampled by the peripheral on every status report.
//!
//! This module handles:
//! - Button and analog source traits
//! - Parsing input source descriptors
//! - Creating sources from descriptors through registered engines
//! - Falling back to inert sources when a descriptor cannot be satisfied

pub mod param;
pub mod virtual_input;
pub mod evdev_input;

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ExtraHidError, Result};
use crate::protocol::protocol::HidStatus;
use param::ParamPackage;

/// Digital button source
pub trait ButtonDevice: Send {
    fn is_pressed(&self) -> bool;
}

/// Two-axis analog source. Axes are normalized to -1.0..=1.0.
pub trait AnalogDevice: Send {
    fn status(&self) -> (f32, f32);
}

/// Button that is never pressed
#[derive(Debug, Clone, Copy, Default)]
pub struct NullButton;

impl ButtonDevice for NullButton {
    fn is_pressed(&self) -> bool {
        false
    }
}

/// Stick that always reads centered
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnalog;

impl AnalogDevice for NullAnalog {
    fn status(&self) -> (f32, f32) {
        (0.0, 0.0)
    }
}

/// Backend able to create sources from a descriptor
pub trait InputEngine: Send + Sync {
    fn create_button(&self, params: &ParamPackage) -> Result<Box<dyn ButtonDevice>>;

    fn create_analog(&self, params: &ParamPackage) -> Result<Box<dyn AnalogDevice>>;
}

/// Logical inputs of the peripheral mapped to source descriptors
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct InputMapping {
    #[serde(default = "default_zl")]
    pub zl: String,

    #[serde(default = "default_zr")]
    pub zr: String,

    #[serde(default = "default_c_stick")]
    pub c_stick: String,
}

fn default_zl() -> String { "engine:virtual,name:zl".to_string() }
fn default_zr() -> String { "engine:virtual,name:zr".to_string() }
fn default_c_stick() -> String { "engine:virtual,name:c_stick".to_string() }

impl Default for InputMapping {
    fn default() -> Self {
        Self {
            zl: default_zl(),
            zr: default_zr(),
            c_stick: default_c_stick(),
        }
    }
}

/// Engines by name
#[derive(Default)]
pub struct InputRegistry {
    engines: HashMap<String, Box<dyn InputEngine>>,
}

impl std::fmt::Debug for InputRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.engines.keys().collect();
        names.sort();
        f.debug_struct("InputRegistry")
            .field("engines", &names)
            .finish()
    }
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under `name`, replacing any previous one
    pub fn register<E: InputEngine + 'static>(&mut self, name: &str, engine: E) {
        self.engines.insert(name.to_string(), Box::new(engine));
    }

    fn engine_for(&self, params: &ParamPackage) -> Result<&(dyn InputEngine + 'static)> {
        let name = params.engine().unwrap_or_default();
        self.engines
            .get(name)
            .map(|engine| &**engine)
            .ok_or_else(|| ExtraHidError::Input(format!("Unknown input engine '{}'", name)))
    }

    /// Create a button source, falling back to [`NullButton`] on any error
    pub fn create_button(&self, descriptor: &str) -> Box<dyn ButtonDevice> {
        let result = ParamPackage::parse(descriptor)
            .and_then(|params| self.engine_for(&params)?.create_button(&params));

        match result {
            Ok(button) => {
                debug!("Created button source '{}'", descriptor);
                button
            }
            Err(e) => {
                warn!("Button source '{}' unavailable, using inert button: {}", descriptor, e);
                Box::new(NullButton)
            }
        }
    }

    /// Create an analog source, falling back to [`NullAnalog`] on any error
    pub fn create_analog(&self, descriptor: &str) -> Box<dyn AnalogDevice> {
        let result = ParamPackage::parse(descriptor)
            .and_then(|params| self.engine_for(&params)?.create_analog(&params));

        match result {
            Ok(analog) => {
                debug!("Created analog source '{}'", descriptor);
                analog
            }
            Err(e) => {
                warn!("Analog source '{}' unavailable, using centered stick: {}", descriptor, e);
                Box::new(NullAnalog)
            }
        }
    }
}

/// The three sources sampled for each status report
pub struct InputDevices {
    zl: Box<dyn ButtonDevice>,
    zr: Box<dyn ButtonDevice>,
    c_stick: Box<dyn AnalogDevice>,
}

impl std::fmt::Debug for InputDevices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDevices").finish_non_exhaustive()
    }
}

impl InputDevices {
    /// Acquire all sources named by `mapping`
    pub fn load(registry: &InputRegistry, mapping: &InputMapping) -> Self {
        Self {
            zl: registry.create_button(&mapping.zl),
            zr: registry.create_button(&mapping.zr),
            c_stick: registry.create_analog(&mapping.c_stick),
        }
    }

    /// Read the current state of every source
    pub fn sample(&self) -> HidStatus {
        HidStatus::from_inputs(
            self.c_stick.status(),
            self.zl.is_pressed(),
            self.zr.is_pressed(),
        )
    }
}
