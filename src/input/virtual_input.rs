//! In-memory input engine
//!
//! Named buttons and sticks whose state is set programmatically, e.g. from the
//! session driver's `press`/`stick` commands or from tests. Sources created
//! from the same name share state, and setters may be called from any thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::param::ParamPackage;
use super::{AnalogDevice, ButtonDevice, InputEngine};
use crate::error::Result;

/// Stick state stored as f32 bit patterns so reads never block
#[derive(Debug, Default)]
struct StickState {
    x: AtomicU32,
    y: AtomicU32,
}

impl StickState {
    fn set(&self, x: f32, y: f32) {
        self.x.store(x.to_bits(), Ordering::Relaxed);
        self.y.store(y.to_bits(), Ordering::Relaxed);
    }

    fn get(&self) -> (f32, f32) {
        (
            f32::from_bits(self.x.load(Ordering::Relaxed)),
            f32::from_bits(self.y.load(Ordering::Relaxed)),
        )
    }
}

#[derive(Debug, Default)]
struct Sources {
    buttons: HashMap<String, Arc<AtomicBool>>,
    sticks: HashMap<String, Arc<StickState>>,
}

/// Shared table of virtual sources
#[derive(Debug, Clone, Default)]
pub struct VirtualInput {
    sources: Arc<Mutex<Sources>>,
}

impl VirtualInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn sources(&self) -> MutexGuard<'_, Sources> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn button(&self, name: &str) -> Arc<AtomicBool> {
        self.sources()
            .buttons
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn stick(&self, name: &str) -> Arc<StickState> {
        self.sources()
            .sticks
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    pub fn set_button(&self, name: &str, pressed: bool) {
        self.button(name).store(pressed, Ordering::Relaxed);
    }

    pub fn set_stick(&self, name: &str, x: f32, y: f32) {
        self.stick(name).set(x, y);
    }
}

/// Button backed by a shared flag
#[derive(Debug, Clone)]
pub struct VirtualButton {
    state: Arc<AtomicBool>,
}

impl ButtonDevice for VirtualButton {
    fn is_pressed(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }
}

/// Stick backed by shared axis values
#[derive(Debug, Clone)]
pub struct VirtualAnalog {
    state: Arc<StickState>,
}

impl AnalogDevice for VirtualAnalog {
    fn status(&self) -> (f32, f32) {
        self.state.get()
    }
}

impl InputEngine for VirtualInput {
    fn create_button(&self, params: &ParamPackage) -> Result<Box<dyn ButtonDevice>> {
        let name = params.require("name")?;
        Ok(Box::new(VirtualButton {
            state: self.button(name),
        }))
    }

    fn create_analog(&self, params: &ParamPackage) -> Result<Box<dyn AnalogDevice>> {
        let name = params.require("name")?;
        Ok(Box::new(VirtualAnalog {
            state: self.stick(name),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(descriptor: &str) -> ParamPackage {
        ParamPackage::parse(descriptor).unwrap()
    }

    #[test]
    fn test_button_reflects_state() {
        let input = VirtualInput::new();
        let button = input.create_button(&params("engine:virtual,name:zl")).unwrap();

        assert!(!button.is_pressed());
        input.set_button("zl", true);
        assert!(button.is_pressed());
        input.set_button("zl", false);
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_state_set_before_creation_is_kept() {
        let input = VirtualInput::new();
        input.set_button("zr", true);
        input.set_stick("c_stick", 0.25, -0.5);

        let button = input.create_button(&params("name:zr")).unwrap();
        let analog = input.create_analog(&params("name:c_stick")).unwrap();
        assert!(button.is_pressed());
        assert_eq!(analog.status(), (0.25, -0.5));
    }

    #[test]
    fn test_names_are_independent() {
        let input = VirtualInput::new();
        let zl = input.create_button(&params("name:zl")).unwrap();
        let zr = input.create_button(&params("name:zr")).unwrap();

        input.set_button("zl", true);
        assert!(zl.is_pressed());
        assert!(!zr.is_pressed());
    }

    #[test]
    fn test_missing_name_is_error() {
        let input = VirtualInput::new();
        assert!(input.create_button(&params("engine:virtual")).is_err());
        assert!(input.create_analog(&params("engine:virtual")).is_err());
    }

    #[test]
    fn test_set_from_other_thread() {
        let input = VirtualInput::new();
        let analog = input.create_analog(&params("name:c_stick")).unwrap();

        let writer = input.clone();
        std::thread::spawn(move || writer.set_stick("c_stick", 1.0, 1.0))
            .join()
            .unwrap();

        assert_eq!(analog.status(), (1.0, 1.0));
    }
}
