//! # Extra HID Device Module
//!
//! The emulated peripheral as seen by the infrared channel.
//!
//! This module handles:
//! - Dispatching inbound requests by ID
//! - Serving calibration data reads
//! - Configuring and emitting periodic HID status reports
//! - Hot-reloading input sources without tearing the device down
//!
//! ## Request Flow
//!
//! | Request | Size | Effect |
//! |---------|------|--------|
//! | `0x01` ReadHidStatus | 3 | (Re)starts status reports every `data[1]` ms |
//! | `0x02` ReadCalibrationData | 6 | Replies `0x11` + echoed offset/size + data |
//! | anything else | - | Logged and dropped |
//!
//! Malformed or unknown requests never produce a response and never change
//! device state.
//!
//! ## Usage
//!
//! ```
//! use bytes::Bytes;
//! use extra_hid::device::ExtraHid;
//! use extra_hid::input::{InputMapping, InputRegistry};
//! use extra_hid::timing::{TickRate, VirtualTimer};
//!
//! let timer = VirtualTimer::new();
//! let mut sent: Vec<Bytes> = Vec::new();
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let transport = extra_hid::transport::ChannelTransport::new(tx);
//!
//! let mut device = ExtraHid::new(
//!     Box::new(timer.clone()),
//!     Box::new(transport),
//!     InputRegistry::new(),
//!     InputMapping::default(),
//!     TickRate::new(1000),
//! );
//!
//! // Poll every 5 ms
//! device.receive(&[0x01, 0x05, 0x00]);
//! for event in timer.advance(5) {
//!     device.on_status_tick(event.handle, event.lateness);
//! }
//! while let Ok(packet) = rx.try_recv() {
//!     sent.push(packet);
//! }
//! assert_eq!(sent.len(), 1);
//! assert_eq!(sent[0][0], 0x10);
//! ```

pub mod broadcast;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::input::{InputDevices, InputMapping, InputRegistry};
use crate::protocol::calibration::CalibrationData;
use crate::protocol::decoder::decode_request;
use crate::protocol::encoder::{encode_calibration_response, encode_hid_status};
use crate::protocol::protocol::{hex_string, Request};
use crate::timing::{EventHandle, EventScheduler, TickRate};
use crate::transport::Transport;
use broadcast::StatusBroadcast;

/// Thread-safe handle for requesting an input reload
///
/// The reload itself happens at the start of the next status report, never
/// in the middle of sampling.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    pending: Arc<AtomicBool>,
    mapping: Arc<RwLock<InputMapping>>,
}

impl ReloadHandle {
    /// Re-acquire input sources from the current mapping
    pub fn request(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Replace the input mapping, then request a reload
    pub fn remap(&self, mapping: InputMapping) {
        *self.mapping.write().unwrap_or_else(PoisonError::into_inner) = mapping;
        self.request();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Emulated extra HID peripheral (C-stick, ZL, ZR)
pub struct ExtraHid {
    scheduler: Box<dyn EventScheduler>,
    transport: Box<dyn Transport>,
    registry: InputRegistry,
    mapping: Arc<RwLock<InputMapping>>,
    inputs: InputDevices,
    calibration: CalibrationData,
    broadcast: StatusBroadcast,
    reload_pending: Arc<AtomicBool>,
}

impl std::fmt::Debug for ExtraHid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtraHid")
            .field("registry", &self.registry)
            .field("broadcast", &self.broadcast)
            .field("reload_pending", &self.reload_pending.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ExtraHid {
    /// Create the peripheral and acquire its input sources
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Event scheduling service used for status reports
    /// * `transport` - Receives every response and status report
    /// * `registry` - Input engines used to create sources
    /// * `mapping` - Source descriptors for ZL, ZR and the C-stick
    /// * `tick_rate` - Scheduler ticks per second
    pub fn new(
        scheduler: Box<dyn EventScheduler>,
        transport: Box<dyn Transport>,
        registry: InputRegistry,
        mapping: InputMapping,
        tick_rate: TickRate,
    ) -> Self {
        let inputs = InputDevices::load(&registry, &mapping);

        Self {
            scheduler,
            transport,
            registry,
            mapping: Arc::new(RwLock::new(mapping)),
            inputs,
            calibration: CalibrationData::factory(),
            broadcast: StatusBroadcast::new(tick_rate),
            reload_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The peripheral needs no handshake
    pub fn connect(&mut self) {
        debug!("Extra HID connected");
    }

    /// Stop status reports. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.broadcast.disarm(&mut *self.scheduler);
    }

    /// Flag the input sources for re-acquisition on the next status report
    pub fn reload_input_devices(&self) {
        self.reload_pending.store(true, Ordering::SeqCst);
    }

    /// Handle usable from other threads to trigger [`reload_input_devices`](Self::reload_input_devices)
    pub fn reload_handle(&self) -> ReloadHandle {
        ReloadHandle {
            pending: Arc::clone(&self.reload_pending),
            mapping: Arc::clone(&self.mapping),
        }
    }

    /// Configured polling period, `None` while idle
    pub fn period_ms(&self) -> Option<u8> {
        self.broadcast.period_ms()
    }

    pub fn is_polling(&self) -> bool {
        self.broadcast.is_armed()
    }

    /// Event the device expects to be fired next
    pub fn pending_event(&self) -> Option<EventHandle> {
        self.broadcast.pending()
    }

    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Handle one complete inbound packet
    ///
    /// Never fails: invalid requests are logged and dropped.
    pub fn receive(&mut self, data: &[u8]) {
        debug!("Received request: {}", hex_string(data));

        match decode_request(data) {
            Ok(Request::ReadHidStatus { period_ms }) => {
                self.handle_read_hid_status(period_ms);
            }
            Ok(Request::ReadCalibrationData { offset, size }) => {
                self.handle_read_calibration_data(offset, size);
            }
            Err(e) => {
                warn!("Dropping request [{}]: {}", hex_string(data), e);
            }
        }
    }

    fn handle_read_hid_status(&mut self, period_ms: u8) {
        info!("Guest configured HID status polling every {} ms", period_ms);
        self.broadcast.arm(&mut *self.scheduler, period_ms);
    }

    fn handle_read_calibration_data(&mut self, offset: u16, size: u16) {
        let data = match self.calibration.read(offset, size) {
            Ok(data) => data,
            Err(e) => {
                warn!("Dropping calibration read: {}", e);
                return;
            }
        };

        let response = encode_calibration_response(offset, size, data);
        debug!("Sending calibration data: {}", hex_string(&response));
        self.transport.send(response);
    }

    /// Emit one HID status report
    ///
    /// Called by the host when the event scheduled by this device fires.
    ///
    /// # Arguments
    ///
    /// * `handle` - The event that fired
    /// * `lateness` - Ticks between the event's deadline and now
    ///
    /// Events other than the pending one (e.g. left over from before a
    /// reconfiguration or disconnect) are ignored.
    pub fn on_status_tick(&mut self, handle: EventHandle, lateness: u64) {
        if !self.broadcast.is_current(handle) {
            debug!("Ignoring stale status event {:?}", handle);
            return;
        }

        if self.reload_pending.swap(false, Ordering::SeqCst) {
            self.load_input_devices();
        }

        let status = self.inputs.sample();
        let packet = encode_hid_status(&status);
        debug!("Sending HID status: {}", hex_string(&packet));
        self.transport.send(packet);

        self.broadcast.rearm_after_tick(&mut *self.scheduler, lateness);
    }

    fn load_input_devices(&mut self) {
        let mapping = self
            .mapping
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        info!("Reloading input sources (zl: '{}', zr: '{}', c_stick: '{}')",
            mapping.zl, mapping.zr, mapping.c_stick);
        self.inputs = InputDevices::load(&self.registry, &mapping);
    }
}

impl Drop for ExtraHid {
    fn drop(&mut self) {
        self.disconnect();
    }
}
