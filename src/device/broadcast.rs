//! # Status Broadcast Module
//!
//! Owns the polling period and the single pending status event.
//!
//! ## States
//!
//! - **Idle**: no polling configured, nothing scheduled
//! - **Armed**: a period is set and exactly one event is pending
//!
//! Arming while already armed cancels the pending event and starts a fresh
//! full interval. After every report the next event is scheduled at
//! `period - lateness`, so a late tick pulls the following one in and the
//! long-run report rate stays at the configured period.

use tracing::debug;

use crate::timing::{EventHandle, EventScheduler, TickRate};

/// Broadcast state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    Idle,
    Armed { period_ms: u8, pending: EventHandle },
}

/// Periodic HID status scheduling
#[derive(Debug, Clone)]
pub struct StatusBroadcast {
    tick_rate: TickRate,
    state: BroadcastState,
}

impl StatusBroadcast {
    pub fn new(tick_rate: TickRate) -> Self {
        Self {
            tick_rate,
            state: BroadcastState::Idle,
        }
    }

    pub fn state(&self) -> BroadcastState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, BroadcastState::Armed { .. })
    }

    /// Configured period, if polling is active
    pub fn period_ms(&self) -> Option<u8> {
        match self.state {
            BroadcastState::Armed { period_ms, .. } => Some(period_ms),
            BroadcastState::Idle => None,
        }
    }

    /// Currently pending event, if any
    pub fn pending(&self) -> Option<EventHandle> {
        match self.state {
            BroadcastState::Armed { pending, .. } => Some(pending),
            BroadcastState::Idle => None,
        }
    }

    /// Whether `handle` is the event this broadcast is waiting for
    pub fn is_current(&self, handle: EventHandle) -> bool {
        self.pending() == Some(handle)
    }

    /// Start polling with a new period, replacing any pending event
    pub fn arm(&mut self, scheduler: &mut dyn EventScheduler, period_ms: u8) {
        self.disarm(scheduler);

        let delay = self.tick_rate.ms_to_ticks(u64::from(period_ms));
        let pending = scheduler.schedule(delay);
        debug!("HID status polling armed: period {} ms ({} ticks)", period_ms, delay);

        self.state = BroadcastState::Armed { period_ms, pending };
    }

    /// Schedule the event following a report that fired `lateness` ticks late
    ///
    /// The fired event is no longer pending, so nothing is cancelled here.
    ///
    /// # Returns
    ///
    /// * `Option<u64>` - Delay of the newly scheduled event, `None` if idle
    pub fn rearm_after_tick(
        &mut self,
        scheduler: &mut dyn EventScheduler,
        lateness: u64,
    ) -> Option<u64> {
        let BroadcastState::Armed { period_ms, .. } = self.state else {
            return None;
        };

        // A tick later than a whole period fires the next one immediately
        let delay = self
            .tick_rate
            .ms_to_ticks(u64::from(period_ms))
            .saturating_sub(lateness);
        let pending = scheduler.schedule(delay);

        self.state = BroadcastState::Armed { period_ms, pending };
        Some(delay)
    }

    /// Stop polling and cancel the pending event. Safe to call when idle.
    pub fn disarm(&mut self, scheduler: &mut dyn EventScheduler) {
        if let BroadcastState::Armed { pending, .. } = self.state {
            scheduler.cancel(pending);
            debug!("HID status polling disarmed");
        }
        self.state = BroadcastState::Idle;
    }
}
