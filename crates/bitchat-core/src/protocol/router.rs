//! Flood router (§4.7): duplicate suppression, TTL-bounded relay, and the
//! local-delivery-vs-relay split that `bitchat-runtime`'s transport and
//! bridge managers (C10/C11) act on.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use hashbrown::HashSet;
use sha2::{Digest, Sha256};

use crate::protocol::packet::{BitchatPacket, MessageType};
use crate::transport::TransportKind;
use crate::types::{PeerId, TimeSource, Timestamp};
use crate::{BitchatError, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum number of fingerprints retained (§5 resource cap).
pub const ROUTER_SEEN_CAPACITY: usize = 5_000;

/// TTL for a seen fingerprint before it ages out even if capacity allows it
/// to linger (§3).
pub const ROUTER_SEEN_TTL_SECS: u64 = 300;

/// How many of our own past peer IDs we still recognize as "us" after a
/// rotation (§4.4/S5), so packets addressed to a pre-rotation ID are still
/// delivered locally instead of relayed.
const RECENT_LOCAL_IDS: usize = 4;

// ----------------------------------------------------------------------------
// RouterSeen
// ----------------------------------------------------------------------------

/// Bounded, insertion-ordered set of recent packet fingerprints used to
/// suppress relay loops. FIFO eviction at [`ROUTER_SEEN_CAPACITY`], entries
/// also age out after [`ROUTER_SEEN_TTL_SECS`].
pub struct RouterSeen {
    order: VecDeque<([u8; 32], Timestamp)>,
    members: HashSet<[u8; 32]>,
    capacity: usize,
    ttl_secs: u64,
}

impl RouterSeen {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(1024)),
            members: HashSet::with_capacity(capacity.min(1024)),
            capacity,
            ttl_secs,
        }
    }

    /// Compute `SHA-256(senderID || timestamp_ms_be || first16(payload))`.
    pub fn fingerprint(sender_id: PeerId, timestamp_ms: u64, payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(sender_id.as_bytes());
        hasher.update(timestamp_ms.to_be_bytes());
        let head = &payload[..payload.len().min(16)];
        hasher.update(head);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    /// Returns true if the fingerprint was already present (and thus the
    /// packet is a loop/duplicate). Inserts it regardless so a second lookup
    /// is not required by callers.
    pub fn check_and_insert<T: TimeSource>(&mut self, fingerprint: [u8; 32], time: &T) -> bool {
        self.evict_expired(time);

        if self.members.contains(&fingerprint) {
            return true;
        }

        self.members.insert(fingerprint);
        self.order.push_back((fingerprint, time.now()));

        while self.order.len() > self.capacity {
            if let Some((oldest, _)) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }

        false
    }

    fn evict_expired<T: TimeSource>(&mut self, time: &T) {
        let now = time.now();
        while let Some((fp, seen_at)) = self.order.front().copied() {
            if now.duration_since(seen_at).as_secs() > self.ttl_secs {
                self.order.pop_front();
                self.members.remove(&fp);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for RouterSeen {
    fn default() -> Self {
        Self::new(ROUTER_SEEN_CAPACITY, ROUTER_SEEN_TTL_SECS)
    }
}

// ----------------------------------------------------------------------------
// Route outcome
// ----------------------------------------------------------------------------

/// What the router decided to do with an inbound packet.
#[derive(Debug, Clone, Default)]
pub struct RouteOutcome {
    /// Hand the packet upward (to C5/application) on this node.
    pub deliver_local: bool,
    /// Relay this (already TTL-decremented) packet outward on every
    /// transport except the one it arrived on, subject to C11's bridging
    /// rule. `None` means do not relay (consumed locally, TTL-exhausted, or
    /// a duplicate).
    pub relay: Option<BitchatPacket>,
}

impl RouteOutcome {
    fn dropped() -> Self {
        Self {
            deliver_local: false,
            relay: None,
        }
    }
}

// ----------------------------------------------------------------------------
// Router
// ----------------------------------------------------------------------------

/// Owns `RouterSeen` and applies §4.7's relay decision to each inbound
/// packet. One router per node; not per-peer.
pub struct Router {
    seen: RouterSeen,
    local_ids: VecDeque<PeerId>,
}

impl Router {
    pub fn new(local_peer_id: PeerId) -> Self {
        let mut local_ids = VecDeque::with_capacity(RECENT_LOCAL_IDS);
        local_ids.push_back(local_peer_id);
        Self {
            seen: RouterSeen::default(),
            local_ids,
        }
    }

    pub fn with_seen(local_peer_id: PeerId, seen: RouterSeen) -> Self {
        let mut local_ids = VecDeque::with_capacity(RECENT_LOCAL_IDS);
        local_ids.push_back(local_peer_id);
        Self { seen, local_ids }
    }

    /// Record a peer-ID rotation (§4.4) so packets still addressed to the
    /// pre-rotation ID keep being delivered locally rather than relayed.
    pub fn note_rotation(&mut self, new_peer_id: PeerId) {
        self.local_ids.push_back(new_peer_id);
        while self.local_ids.len() > RECENT_LOCAL_IDS {
            self.local_ids.pop_front();
        }
    }

    fn is_addressed_to_us(&self, packet: &BitchatPacket) -> bool {
        match packet.recipient_id {
            Some(recipient) => self.local_ids.iter().any(|id| *id == recipient),
            None => false,
        }
    }

    /// Apply the §4.7 algorithm to an inbound packet received on `origin`.
    pub fn process_inbound<T: TimeSource>(
        &mut self,
        packet: BitchatPacket,
        time: &T,
    ) -> Result<RouteOutcome> {
        let fingerprint = RouterSeen::fingerprint(
            packet.sender_id,
            packet.header.timestamp.as_millis(),
            packet.payload(),
        );

        if self.seen.check_and_insert(fingerprint, time) {
            return Ok(RouteOutcome::dropped());
        }

        if packet.header.message_type == MessageType::NoiseEncrypted && self.is_addressed_to_us(&packet) {
            return Ok(RouteOutcome {
                deliver_local: true,
                relay: None,
            });
        }

        let always_local = matches!(
            packet.header.message_type,
            MessageType::Announce | MessageType::Leave
        );

        let deliver_local = self.is_addressed_to_us(&packet) || packet.is_broadcast() || always_local;

        if packet.header.ttl.value() == 0 {
            return Ok(RouteOutcome {
                deliver_local,
                relay: None,
            });
        }

        let relayed = packet
            .decremented_ttl()
            .ok_or_else(|| BitchatError::invalid_packet("ttl underflow during relay"))?;

        Ok(RouteOutcome {
            deliver_local,
            relay: Some(relayed),
        })
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SystemTimeSource;

    fn packet(sender: PeerId, recipient: Option<PeerId>, ttl: u8, kind: MessageType) -> BitchatPacket {
        let payload: Vec<u8> = b"hello".to_vec();
        let mut p = BitchatPacket::new(
            kind,
            sender,
            recipient,
            Timestamp::now(),
            payload,
            crate::protocol::packet::PacketFlags::NONE,
            crate::types::Ttl::new(ttl),
        )
        .unwrap();
        if recipient.is_some() {
            p = p.with_recipient(recipient.unwrap());
        }
        p
    }

    #[test]
    fn test_duplicate_dropped() {
        let time = SystemTimeSource::new();
        let me = PeerId::new([9; 8]);
        let mut router = Router::new(me);

        let sender = PeerId::new([1; 8]);
        let p1 = packet(sender, None, 3, MessageType::Message);
        let p2 = p1.clone();

        let first = router.process_inbound(p1, &time).unwrap();
        assert!(first.deliver_local);
        assert!(first.relay.is_some());

        let second = router.process_inbound(p2, &time).unwrap();
        assert!(!second.deliver_local);
        assert!(second.relay.is_none());
    }

    #[test]
    fn test_ttl_zero_is_not_relayed() {
        let time = SystemTimeSource::new();
        let me = PeerId::new([9; 8]);
        let mut router = Router::new(me);

        let sender = PeerId::new([2; 8]);
        let p = packet(sender, None, 0, MessageType::Message);
        let outcome = router.process_inbound(p, &time).unwrap();
        assert!(outcome.deliver_local);
        assert!(outcome.relay.is_none());
    }

    #[test]
    fn test_private_packet_for_us_is_not_relayed() {
        let time = SystemTimeSource::new();
        let me = PeerId::new([9; 8]);
        let mut router = Router::new(me);

        let sender = PeerId::new([3; 8]);
        let p = packet(sender, Some(me), 5, MessageType::NoiseEncrypted);
        let outcome = router.process_inbound(p, &time).unwrap();
        assert!(outcome.deliver_local);
        assert!(outcome.relay.is_none());
    }

    #[test]
    fn test_private_packet_for_someone_else_only_relays() {
        let time = SystemTimeSource::new();
        let me = PeerId::new([9; 8]);
        let mut router = Router::new(me);

        let sender = PeerId::new([4; 8]);
        let other = PeerId::new([5; 8]);
        let p = packet(sender, Some(other), 5, MessageType::NoiseEncrypted);
        let outcome = router.process_inbound(p, &time).unwrap();
        assert!(!outcome.deliver_local);
        assert!(outcome.relay.is_some());
        assert_eq!(outcome.relay.unwrap().header.ttl.value(), 4);
    }

    #[test]
    fn test_rotation_keeps_old_id_recognized() {
        let time = SystemTimeSource::new();
        let old_id = PeerId::new([9; 8]);
        let new_id = PeerId::new([10; 8]);
        let mut router = Router::new(old_id);
        router.note_rotation(new_id);

        let sender = PeerId::new([6; 8]);
        let p = packet(sender, Some(old_id), 5, MessageType::NoiseEncrypted);
        let outcome = router.process_inbound(p, &time).unwrap();
        assert!(outcome.deliver_local);
        assert!(outcome.relay.is_none());
    }
}
