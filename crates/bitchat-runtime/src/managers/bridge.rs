//! Bridge manager for the BitChat runtime (§4.11)
//!
//! Once the router (C7) has decided a packet should be relayed, the bridge
//! manager decides whether that relay should also cross onto transports
//! other than the one the packet arrived on — the thing that actually joins
//! a BLE-only pocket of the mesh to a peer-transport-only one.

use alloc::vec::Vec;

use bitchat_core::{BitchatPacket, PeerRegistry, TimeSource, TransportKind};

const ALL_TRANSPORTS: [TransportKind; 2] = [TransportKind::Ble, TransportKind::Peer];

/// A relayed packet and the extra transports it should also go out on.
#[derive(Debug, Clone)]
pub struct BridgeDecision {
    pub targets: Vec<TransportKind>,
    pub packet: BitchatPacket,
}

/// Stateless by itself — reads the already-stateful `PeerRegistry` (C9) and
/// the router's relay output (C7) to decide cross-transport forwarding. The
/// router inserts each packet's fingerprint into `RouterSeen` at ingestion,
/// before a bridge decision is ever made, so bridged copies cannot loop back
/// in as if they were new.
#[derive(Debug, Default)]
pub struct BridgeManager;

impl BridgeManager {
    pub fn new() -> Self {
        Self
    }

    /// `relayed` is the packet the router already decided to relay (its TTL
    /// has been decremented once for the in-mesh hop). `origin` is the
    /// transport it arrived on. Returns `None` if bridging would not reach
    /// anyone, or if the extra hop would exhaust the TTL.
    pub fn plan<R: TimeSource>(
        &self,
        relayed: &BitchatPacket,
        origin: TransportKind,
        registry: &PeerRegistry<R>,
    ) -> Option<BridgeDecision> {
        let targets = if relayed.is_broadcast() {
            self.broadcast_targets(origin, registry)
        } else {
            self.unicast_targets(relayed, origin, registry)
        };

        if targets.is_empty() {
            return None;
        }

        let bridged = relayed.decremented_ttl()?;
        Some(BridgeDecision {
            targets,
            packet: bridged,
        })
    }

    fn unicast_targets<R: TimeSource>(
        &self,
        packet: &BitchatPacket,
        origin: TransportKind,
        registry: &PeerRegistry<R>,
    ) -> Vec<TransportKind> {
        let recipient = match packet.recipient_id {
            Some(id) => id,
            None => return Vec::new(),
        };

        registry
            .select_transport(recipient)
            .filter(|&kind| kind != origin)
            .into_iter()
            .collect()
    }

    /// Forward onto every other transport that currently has at least one
    /// visible peer — a broadcast reaches whoever is out there, not just a
    /// single named recipient.
    fn broadcast_targets<R: TimeSource>(
        &self,
        origin: TransportKind,
        registry: &PeerRegistry<R>,
    ) -> Vec<TransportKind> {
        ALL_TRANSPORTS
            .into_iter()
            .filter(|&kind| kind != origin)
            .filter(|&kind| registry.has_peers_on(kind))
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_core::protocol::packet::{MessageType, PacketFlags};
    use bitchat_core::{PeerId, SystemTimeSource, Timestamp, Ttl};

    fn packet(recipient: Option<PeerId>, ttl: u8, kind: MessageType) -> BitchatPacket {
        let sender = PeerId::new([1; 8]);
        let mut p = BitchatPacket::new(
            kind,
            sender,
            recipient,
            Timestamp::now(),
            b"hi".to_vec(),
            PacketFlags::NONE,
            Ttl::new(ttl),
        )
        .unwrap();
        if let Some(r) = recipient {
            p = p.with_recipient(r);
        }
        p
    }

    #[test]
    fn test_broadcast_bridges_to_transport_with_visible_peers() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        registry.observe(PeerId::new([9; 8]), TransportKind::Peer, None);

        let bridge = BridgeManager::new();
        let p = packet(None, 5, MessageType::Message);

        let decision = bridge.plan(&p, TransportKind::Ble, &registry).unwrap();
        assert_eq!(decision.targets, alloc::vec![TransportKind::Peer]);
        assert_eq!(decision.packet.header.ttl.value(), 4);
    }

    #[test]
    fn test_broadcast_no_bridge_when_no_one_visible_elsewhere() {
        let registry = PeerRegistry::new(SystemTimeSource::new());
        let bridge = BridgeManager::new();
        let p = packet(None, 5, MessageType::Message);

        assert!(bridge.plan(&p, TransportKind::Ble, &registry).is_none());
    }

    #[test]
    fn test_unicast_bridges_only_toward_recipients_transport() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let recipient = PeerId::new([7; 8]);
        registry.observe(recipient, TransportKind::Peer, None);

        let bridge = BridgeManager::new();
        let p = packet(Some(recipient), 5, MessageType::Message);

        let decision = bridge.plan(&p, TransportKind::Ble, &registry).unwrap();
        assert_eq!(decision.targets, alloc::vec![TransportKind::Peer]);
    }

    #[test]
    fn test_unicast_no_bridge_when_recipient_only_on_origin() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let recipient = PeerId::new([8; 8]);
        registry.observe(recipient, TransportKind::Ble, None);

        let bridge = BridgeManager::new();
        let p = packet(Some(recipient), 5, MessageType::Message);

        assert!(bridge.plan(&p, TransportKind::Ble, &registry).is_none());
    }

    #[test]
    fn test_ttl_exhausted_after_bridge_hop_is_not_forwarded() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        registry.observe(PeerId::new([9; 8]), TransportKind::Peer, None);

        let bridge = BridgeManager::new();
        let p = packet(None, 0, MessageType::Message);

        assert!(bridge.plan(&p, TransportKind::Ble, &registry).is_none());
    }
}
