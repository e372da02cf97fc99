//! Deterministic virtual-time scheduler
//!
//! Time only moves when the host calls [`VirtualTimer::advance`]. Every event
//! whose deadline has passed is then reported together with its lateness, so
//! the device can correct its next deadline for drift.
//!
//! Clones share the same clock and queue: the device owns one clone as its
//! [`EventScheduler`] while the host keeps another to drive time.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::{EventHandle, EventScheduler};

/// An event that came due during [`VirtualTimer::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredEvent {
    pub handle: EventHandle,

    /// Ticks between the event's deadline and the time it fired
    pub lateness: u64,
}

#[derive(Debug, Default)]
struct TimerState {
    now: u64,
    next_id: u64,
    /// Pending events ordered by (deadline, id)
    queue: BTreeSet<(u64, u64)>,
    /// Deadline lookup for cancellation
    deadlines: HashMap<u64, u64>,
}

/// Shared virtual clock and event queue
#[derive(Debug, Clone, Default)]
pub struct VirtualTimer {
    state: Arc<Mutex<TimerState>>,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time in ticks
    pub fn now(&self) -> u64 {
        self.state().now
    }

    /// Number of events waiting to fire
    pub fn pending_count(&self) -> usize {
        self.state().queue.len()
    }

    /// Absolute deadline of a pending event
    pub fn deadline_of(&self, handle: EventHandle) -> Option<u64> {
        self.state().deadlines.get(&handle.0).copied()
    }

    /// Deadline of the earliest pending event
    pub fn next_deadline(&self) -> Option<u64> {
        self.state().queue.first().map(|&(deadline, _)| deadline)
    }

    /// Advance virtual time and collect every event that is now due
    ///
    /// # Arguments
    ///
    /// * `ticks` - Amount of virtual time to advance
    ///
    /// # Returns
    ///
    /// * `Vec<FiredEvent>` - Due events in deadline order
    ///
    /// Events scheduled while handling the returned events are not part of
    /// this batch, even if their deadline is already in the past. They fire
    /// on the next call, so a zero-delay event cannot spin forever.
    pub fn advance(&self, ticks: u64) -> Vec<FiredEvent> {
        let mut state = self.state();
        state.now = state.now.saturating_add(ticks);
        let now = state.now;

        let mut fired = Vec::new();
        while let Some(&(deadline, id)) = state.queue.first() {
            if deadline > now {
                break;
            }
            state.queue.remove(&(deadline, id));
            state.deadlines.remove(&id);
            fired.push(FiredEvent {
                handle: EventHandle(id),
                lateness: now - deadline,
            });
        }

        if !fired.is_empty() {
            trace!("Advanced to tick {}, {} event(s) due", now, fired.len());
        }
        fired
    }
}

impl EventScheduler for VirtualTimer {
    fn schedule(&mut self, delay: u64) -> EventHandle {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;

        let deadline = state.now.saturating_add(delay);
        state.queue.insert((deadline, id));
        state.deadlines.insert(id, deadline);

        EventHandle(id)
    }

    fn cancel(&mut self, handle: EventHandle) {
        let mut state = self.state();
        if let Some(deadline) = state.deadlines.remove(&handle.0) {
            state.queue.remove(&(deadline, handle.0));
        }
    }
}
