//! # Transport Module
//!
//! Outbound side of the infrared channel.
//!
//! The channel itself (framing, connection, delivery to the guest) belongs to
//! the host. The peripheral only hands finished packets to a [`Transport`]
//! and never looks at a result.

pub mod capture;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Sink for packets produced by the peripheral
pub trait Transport: Send {
    fn send(&mut self, packet: Bytes);
}

impl<F> Transport for F
where
    F: FnMut(Bytes) + Send,
{
    fn send(&mut self, packet: Bytes) {
        self(packet)
    }
}

/// Forwards packets into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: UnboundedSender<Bytes>,
}

impl ChannelTransport {
    pub fn new(tx: UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, packet: Bytes) {
        if self.tx.send(packet).is_err() {
            debug!("Transport receiver closed, dropping packet");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_closure_transport() {
        let mut received = Vec::new();
        {
            let mut transport = |packet: Bytes| received.push(packet);
            transport.send(Bytes::from_static(&[0x10, 0x00]));
        }
        assert_eq!(received, vec![Bytes::from_static(&[0x10, 0x00])]);
    }

    #[tokio::test]
    async fn test_channel_transport() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = ChannelTransport::new(tx);

        transport.send(Bytes::from_static(&[0x11, 0x00]));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(&[0x11, 0x00]));
    }

    #[test]
    fn test_channel_transport_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        // Must not panic
        let mut transport = ChannelTransport::new(tx);
        transport.send(Bytes::from_static(&[0x10]));
    }

    #[test]
    fn test_mock_transport_records() {
        let mock = mocks::MockTransport::new();
        let mut transport = mock.clone();
        transport.send(Bytes::from_static(&[1]));
        transport.send(Bytes::from_static(&[2]));

        assert_eq!(mock.get_sent().len(), 2);
        assert_eq!(mock.take_sent().len(), 2);
        assert!(mock.get_sent().is_empty());
    }
}
