//! Transport abstraction for the BitChat protocol
//!
//! Provides a unified interface over the two concrete transports the mesh
//! engine bridges between (BLE and the local peer-to-peer transport),
//! keeping protocol logic independent of the radio/link underneath. Transport
//! selection and cross-transport bridging live above this trait in
//! `bitchat-runtime`'s transport and bridge managers.

use alloc::{boxed::Box, string::String, vec::Vec};
use smallvec::SmallVec;
use async_trait::async_trait;

use crate::protocol::packet::BitchatPacket;
use crate::types::PeerId;
use crate::Result;

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Unified transport interface for BitChat communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a packet to a specific peer
    async fn send_to(&mut self, peer_id: PeerId, packet: BitchatPacket) -> Result<()>;

    /// Broadcast a packet to all reachable peers
    async fn broadcast(&mut self, packet: BitchatPacket) -> Result<()>;

    /// Receive the next packet from any peer
    async fn receive(&mut self) -> Result<(PeerId, BitchatPacket)>;

    /// Get list of currently discoverable peers (optimized for small collections)
    fn discovered_peers(&self) -> SmallVec<[PeerId; 8]>;

    /// Start the transport (begin scanning, advertising, etc.)
    async fn start(&mut self) -> Result<()>;

    /// Stop the transport and clean up resources
    async fn stop(&mut self) -> Result<()>;

    /// Check if transport is currently active
    fn is_active(&self) -> bool;

    /// Get transport-specific metadata/capabilities
    fn capabilities(&self) -> TransportCapabilities;
}

// ----------------------------------------------------------------------------
// Transport Capabilities
// ----------------------------------------------------------------------------

/// Describes the capabilities and characteristics of a transport
#[derive(Debug, Clone)]
pub struct TransportCapabilities {
    pub kind: TransportKind,
    /// Maximum packet size supported
    pub max_packet_size: usize,
    /// Whether transport supports peer discovery
    pub supports_discovery: bool,
    /// Whether transport supports broadcasting
    pub supports_broadcast: bool,
    /// Typical latency characteristics
    pub latency_class: LatencyClass,
    /// Reliability characteristics
    pub reliability_class: ReliabilityClass,
}

/// The two transports the mesh engine bridges between. Closed rather than
/// open-ended: adding a transport is a protocol-level decision, not a plugin
/// point, so there is no catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TransportKind {
    /// Bluetooth Low Energy
    Ble,
    /// Local peer-to-peer Wi-Fi transport
    Peer,
}

/// Latency characteristics of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyClass {
    /// Very low latency (< 10ms typical)
    VeryLow,
    /// Low latency (< 100ms typical)
    Low,
    /// Medium latency (< 1s typical)
    Medium,
    /// High latency (> 1s typical)
    High,
}

/// Reliability characteristics of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityClass {
    /// Very reliable (> 99% delivery rate)
    VeryHigh,
    /// Reliable (> 95% delivery rate)
    High,
    /// Moderately reliable (> 80% delivery rate)
    Medium,
    /// Unreliable (< 80% delivery rate)
    Low,
}

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// Events that can be emitted by transports
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// New peer discovered
    PeerDiscovered { peer_id: PeerId, kind: TransportKind },
    /// Peer became unreachable
    PeerLost { peer_id: PeerId, kind: TransportKind },
    /// A packet arrived from a peer on this transport
    PacketReceived {
        packet: BitchatPacket,
        source_peer_id: PeerId,
        kind: TransportKind,
    },
    /// A send attempt failed
    SendFailed {
        peer_id: PeerId,
        kind: TransportKind,
        reason: String,
    },
    /// Transport started successfully
    Started { kind: TransportKind },
    /// Transport stopped
    Stopped { kind: TransportKind },
    /// Transport error occurred
    Error { kind: TransportKind, error: String },
}

/// Trait for handling transport events
pub trait TransportEventHandler: Send + Sync {
    /// Handle a transport event
    fn handle_event(&mut self, event: TransportEvent);
}

// ----------------------------------------------------------------------------
// Mock Transport (for testing)
// ----------------------------------------------------------------------------

/// Mock transport implementation for testing
#[cfg(test)]
pub struct MockTransport {
    active: bool,
    peers: SmallVec<[PeerId; 8]>,
    sent_packets: Vec<(Option<PeerId>, BitchatPacket)>,
    receive_queue: Vec<(PeerId, BitchatPacket)>,
    capabilities: TransportCapabilities,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            active: false,
            peers: SmallVec::new(),
            sent_packets: Vec::new(),
            receive_queue: Vec::new(),
            capabilities: TransportCapabilities {
                kind,
                max_packet_size: 1024,
                supports_discovery: true,
                supports_broadcast: true,
                latency_class: LatencyClass::Low,
                reliability_class: ReliabilityClass::High,
            },
        }
    }

    pub fn add_peer(&mut self, peer_id: PeerId) {
        if !self.peers.contains(&peer_id) {
            self.peers.push(peer_id);
        }
    }

    pub fn queue_receive(&mut self, from: PeerId, packet: BitchatPacket) {
        self.receive_queue.push((from, packet));
    }

    pub fn sent_packets(&self) -> &[(Option<PeerId>, BitchatPacket)] {
        &self.sent_packets
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn send_to(&mut self, peer_id: PeerId, packet: BitchatPacket) -> Result<()> {
        self.sent_packets.push((Some(peer_id), packet));
        Ok(())
    }

    async fn broadcast(&mut self, packet: BitchatPacket) -> Result<()> {
        self.sent_packets.push((None, packet));
        Ok(())
    }

    async fn receive(&mut self) -> Result<(PeerId, BitchatPacket)> {
        if let Some((peer_id, packet)) = self.receive_queue.pop() {
            Ok((peer_id, packet))
        } else {
            Err(crate::BitchatError::invalid_packet("no packets to receive"))
        }
    }

    fn discovered_peers(&self) -> SmallVec<[PeerId; 8]> {
        self.peers.clone()
    }

    async fn start(&mut self) -> Result<()> {
        self.active = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities.clone()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::MessageType;

    #[tokio::test]
    async fn test_mock_transport() {
        let mut transport = MockTransport::new(TransportKind::Peer);
        let peer_id = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let packet = BitchatPacket::new_simple(MessageType::Message, peer_id, b"test".to_vec());

        assert!(!transport.is_active());

        transport.start().await.unwrap();
        assert!(transport.is_active());

        transport.add_peer(peer_id);
        let expected: SmallVec<[PeerId; 8]> = smallvec::smallvec![peer_id];
        assert_eq!(transport.discovered_peers(), expected);

        transport.send_to(peer_id, packet.clone()).await.unwrap();
        assert_eq!(transport.sent_packets().len(), 1);

        transport.broadcast(packet).await.unwrap();
        assert_eq!(transport.sent_packets().len(), 2);

        transport.stop().await.unwrap();
        assert!(!transport.is_active());
    }

    #[test]
    fn test_transport_capabilities() {
        let caps = TransportCapabilities {
            kind: TransportKind::Ble,
            max_packet_size: 1024,
            supports_discovery: true,
            supports_broadcast: true,
            latency_class: LatencyClass::Low,
            reliability_class: ReliabilityClass::High,
        };

        assert_eq!(caps.kind, TransportKind::Ble);
        assert!(caps.supports_discovery);
        assert!(caps.supports_broadcast);
    }
}
