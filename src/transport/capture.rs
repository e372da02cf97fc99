//! Packet capture
//!
//! Appends every packet crossing the channel to a JSON Lines file:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123+00:00","direction":"inbound","length":3,"bytes":"01 05 00"}
//! {"timestamp":"2024-05-01T12:00:00.128+00:00","direction":"outbound","length":6,"bytes":"10 00 08 80 FF 00"}
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use tracing::warn;

use super::Transport;
use crate::error::{ExtraHidError, Result};
use crate::protocol::protocol::hex_string;

/// Packet direction as seen from the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Guest to peripheral
    Inbound,
    /// Peripheral to guest
    Outbound,
}

#[derive(Debug, Serialize)]
struct CaptureRecord {
    timestamp: String,
    direction: Direction,
    length: usize,
    bytes: String,
}

/// Shared append-only capture file
#[derive(Debug, Clone)]
pub struct PacketCapture {
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl PacketCapture {
    /// Open (or create) the capture file for appending
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Append one packet record
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the record cannot be serialized or written
    pub fn record(&self, direction: Direction, packet: &[u8]) -> Result<()> {
        let record = CaptureRecord {
            timestamp: Local::now().to_rfc3339(),
            direction,
            length: packet.len(),
            bytes: hex_string(packet),
        };

        let line = serde_json::to_string(&record)
            .map_err(|e| ExtraHidError::Io(e.into()))?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Transport wrapper recording outbound packets before forwarding them
#[derive(Debug)]
pub struct CaptureTransport<T> {
    inner: T,
    capture: PacketCapture,
}

impl<T: Transport> CaptureTransport<T> {
    pub fn new(inner: T, capture: PacketCapture) -> Self {
        Self { inner, capture }
    }
}

impl<T: Transport> Transport for CaptureTransport<T> {
    fn send(&mut self, packet: Bytes) {
        if let Err(e) = self.capture.record(Direction::Outbound, &packet) {
            warn!("Failed to capture outbound packet: {}", e);
        }
        self.inner.send(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mocks::MockTransport;
    use tempfile::NamedTempFile;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_record_writes_json_line() {
        let file = NamedTempFile::new().unwrap();
        let capture = PacketCapture::open(file.path()).unwrap();

        capture.record(Direction::Inbound, &[0x01, 0x05, 0x00]).unwrap();

        let lines = read_lines(file.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["direction"], "inbound");
        assert_eq!(lines[0]["length"], 3);
        assert_eq!(lines[0]["bytes"], "01 05 00");
        assert!(lines[0]["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_capture_appends() {
        let file = NamedTempFile::new().unwrap();

        PacketCapture::open(file.path()).unwrap()
            .record(Direction::Inbound, &[0x01])
            .unwrap();
        PacketCapture::open(file.path()).unwrap()
            .record(Direction::Outbound, &[0x10])
            .unwrap();

        let lines = read_lines(file.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["direction"], "outbound");
    }

    #[test]
    fn test_capture_transport_records_and_forwards() {
        let file = NamedTempFile::new().unwrap();
        let capture = PacketCapture::open(file.path()).unwrap();
        let mock = MockTransport::new();

        let mut transport = CaptureTransport::new(mock.clone(), capture);
        transport.send(Bytes::from_static(&[0x10, 0x00, 0x08, 0x80, 0xFF, 0x00]));

        assert_eq!(mock.get_sent().len(), 1);
        let lines = read_lines(file.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["direction"], "outbound");
        assert_eq!(lines[0]["bytes"], "10 00 08 80 FF 00");
    }

    #[test]
    fn test_open_invalid_path() {
        let result = PacketCapture::open("/nonexistent_dir_12345/capture.jsonl");
        assert!(matches!(result, Err(ExtraHidError::Io(_))));
    }
}
