//! # Timing Module
//!
//! Abstraction over the emulator's event scheduling service.
//!
//! The peripheral never owns a clock. It asks an [`EventScheduler`] to fire
//! an event after a delay (in scheduler ticks) and the host calls back into
//! the device when that event fires, reporting how late it was.
//!
//! This module handles:
//! - The scheduler trait injected into the device
//! - Converting milliseconds to scheduler ticks
//! - A deterministic virtual-time scheduler

pub mod virtual_timer;

pub use virtual_timer::{FiredEvent, VirtualTimer};

/// Emulated ARM11 clock rate, the default scheduler tick rate
pub const BASE_CLOCK_RATE_ARM11: u64 = 268_111_856;

/// Identifies one scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(pub u64);

/// Scheduling service used by the peripheral
#[cfg_attr(test, mockall::automock)]
pub trait EventScheduler: Send {
    /// Schedule an event `delay` ticks from now
    fn schedule(&mut self, delay: u64) -> EventHandle;

    /// Cancel a pending event. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: EventHandle);
}

/// Conversion between milliseconds and scheduler ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRate {
    ticks_per_second: u64,
}

impl Default for TickRate {
    fn default() -> Self {
        Self::new(BASE_CLOCK_RATE_ARM11)
    }
}

impl TickRate {
    #[must_use]
    pub fn new(ticks_per_second: u64) -> Self {
        Self { ticks_per_second }
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    /// Convert milliseconds to ticks, rounding down
    ///
    /// # Examples
    ///
    /// ```
    /// use extra_hid::timing::TickRate;
    ///
    /// assert_eq!(TickRate::new(1000).ms_to_ticks(5), 5);
    /// assert_eq!(TickRate::default().ms_to_ticks(1), 268_111);
    /// ```
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        self.ticks_per_second.saturating_mul(ms) / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tick_rate() {
        assert_eq!(TickRate::default().ticks_per_second(), BASE_CLOCK_RATE_ARM11);
    }

    #[test]
    fn test_ms_to_ticks() {
        let rate = TickRate::new(BASE_CLOCK_RATE_ARM11);
        assert_eq!(rate.ms_to_ticks(0), 0);
        assert_eq!(rate.ms_to_ticks(1000), BASE_CLOCK_RATE_ARM11);
        assert_eq!(rate.ms_to_ticks(255), 68_368_523);
    }

    #[test]
    fn test_ms_to_ticks_millisecond_rate() {
        let rate = TickRate::new(1000);
        for ms in [0, 1, 5, 16, 255] {
            assert_eq!(rate.ms_to_ticks(ms), ms);
        }
    }
}
