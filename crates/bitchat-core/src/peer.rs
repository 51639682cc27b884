//! Peer registry (§4.9): per-transport visibility, RSSI, and delivery
//! health, the single source of truth C10/C11 read from when picking and
//! bridging transports.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::identity::types::TrustLevel;
use crate::transport::TransportKind;
use crate::types::{PeerId, TimeSource, Timestamp};

/// A peer is considered gone from a transport once it has not been seen
/// there for this long (§4.9).
pub const STALENESS_SECS: u64 = 60;

// ----------------------------------------------------------------------------
// Per-transport visibility
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TransportVisibility {
    last_seen: Timestamp,
    rssi: Option<i8>,
    delivery_successes: u32,
    delivery_attempts: u32,
}

impl TransportVisibility {
    fn new(seen_at: Timestamp, rssi: Option<i8>) -> Self {
        Self {
            last_seen: seen_at,
            rssi,
            delivery_successes: 0,
            delivery_attempts: 0,
        }
    }

    fn is_stale(&self, now: Timestamp) -> bool {
        now.duration_since(self.last_seen).as_secs() > STALENESS_SECS
    }

    /// Blend recency, delivery success rate, and RSSI into a single 0.0-1.0
    /// health score. Weighted toward delivery history since a peer that is
    /// visible but never lands packets is not actually usable.
    fn health_score(&self, now: Timestamp) -> f64 {
        let age_secs = now.duration_since(self.last_seen).as_secs() as f64;
        let recency = (1.0 - age_secs / STALENESS_SECS as f64).clamp(0.0, 1.0);

        let delivery = if self.delivery_attempts == 0 {
            0.5
        } else {
            self.delivery_successes as f64 / self.delivery_attempts as f64
        };

        let rssi_score = match self.rssi {
            // -30 dBm (excellent) maps to 1.0, -100 dBm (unusable) to 0.0.
            Some(rssi) => (((rssi as f64) + 100.0) / 70.0).clamp(0.0, 1.0),
            None => 0.5,
        };

        0.4 * recency + 0.4 * delivery + 0.2 * rssi_score
    }
}

// ----------------------------------------------------------------------------
// PeerRecord
// ----------------------------------------------------------------------------

/// Everything the node currently knows about one peer, across all
/// transports it has been seen on.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    pub nickname: Option<String>,
    pub public_key: Option<[u8; 32]>,
    pub trust_level: TrustLevel,
    transports: HashMap<TransportKind, TransportVisibility>,
}

impl PeerRecord {
    fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            nickname: None,
            public_key: None,
            trust_level: TrustLevel::default(),
            transports: HashMap::new(),
        }
    }

    /// Transports this peer is currently visible on (not stale).
    pub fn visible_transports(&self, now: Timestamp) -> Vec<TransportKind> {
        self.transports
            .iter()
            .filter(|(_, v)| !v.is_stale(now))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn is_visible(&self, now: Timestamp) -> bool {
        self.transports.values().any(|v| !v.is_stale(now))
    }

    pub fn last_seen(&self, kind: TransportKind) -> Option<Timestamp> {
        self.transports.get(&kind).map(|v| v.last_seen)
    }

    pub fn rssi(&self, kind: TransportKind) -> Option<i8> {
        self.transports.get(&kind).and_then(|v| v.rssi)
    }
}

// ----------------------------------------------------------------------------
// PeerRegistry
// ----------------------------------------------------------------------------

/// Owns all `PeerRecord`s. C10/C11 are read-only consumers; only the
/// registry mutates peer visibility and delivery counters.
pub struct PeerRegistry<T: TimeSource> {
    peers: HashMap<PeerId, PeerRecord>,
    time_source: T,
}

impl<T: TimeSource> PeerRegistry<T> {
    pub fn new(time_source: T) -> Self {
        Self {
            peers: HashMap::new(),
            time_source,
        }
    }

    /// Record a sighting of `peer_id` on `transport`, created on first
    /// sighting and refreshed on every subsequent one.
    pub fn observe(&mut self, peer_id: PeerId, transport: TransportKind, rssi: Option<i8>) {
        let now = self.time_source.now();
        let record = self
            .peers
            .entry(peer_id)
            .or_insert_with(|| PeerRecord::new(peer_id));

        record
            .transports
            .entry(transport)
            .and_modify(|v| {
                v.last_seen = now;
                if rssi.is_some() {
                    v.rssi = rssi;
                }
            })
            .or_insert_with(|| TransportVisibility::new(now, rssi));
    }

    pub fn set_nickname(&mut self, peer_id: PeerId, nickname: String) {
        if let Some(record) = self.peers.get_mut(&peer_id) {
            record.nickname = Some(nickname);
        }
    }

    pub fn set_public_key(&mut self, peer_id: PeerId, public_key: [u8; 32]) {
        if let Some(record) = self.peers.get_mut(&peer_id) {
            record.public_key = Some(public_key);
        }
    }

    pub fn set_trust_level(&mut self, peer_id: PeerId, trust_level: TrustLevel) {
        if let Some(record) = self.peers.get_mut(&peer_id) {
            record.trust_level = trust_level;
        }
    }

    /// Record a delivery attempt's outcome on a specific transport.
    pub fn mark_delivery(&mut self, peer_id: PeerId, transport: TransportKind, success: bool) {
        let now = self.time_source.now();
        if let Some(record) = self.peers.get_mut(&peer_id) {
            let visibility = record
                .transports
                .entry(transport)
                .or_insert_with(|| TransportVisibility::new(now, None));
            visibility.delivery_attempts += 1;
            if success {
                visibility.delivery_successes += 1;
            }
        }
    }

    /// The best currently-visible transport for this peer, by health score.
    pub fn select_transport(&self, peer_id: PeerId) -> Option<TransportKind> {
        let now = self.time_source.now();
        let record = self.peers.get(&peer_id)?;

        record
            .transports
            .iter()
            .filter(|(_, v)| !v.is_stale(now))
            .max_by(|(_, a), (_, b)| {
                a.health_score(now)
                    .partial_cmp(&b.health_score(now))
                    .unwrap_or(core::cmp::Ordering::Equal)
            })
            .map(|(kind, _)| *kind)
    }

    /// True when this node can bridge: it sees peers on at least two
    /// transports whose visible-peer sets are not subsets of one another
    /// (§4.9/§4.11 — there is someone only reachable via each side).
    pub fn can_bridge(&self) -> bool {
        let now = self.time_source.now();

        let mut kinds: Vec<TransportKind> = Vec::new();
        for record in self.peers.values() {
            for kind in record.visible_transports(now) {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }

        if kinds.len() < 2 {
            return false;
        }

        kinds.iter().any(|&a| {
            kinds.iter().any(|&b| {
                a != b
                    && self
                        .peers
                        .values()
                        .any(|r| {
                            let visible = r.visible_transports(now);
                            visible.contains(&a) && !visible.contains(&b)
                        })
            })
        })
    }

    pub fn get(&self, peer_id: PeerId) -> Option<&PeerRecord> {
        self.peers.get(&peer_id)
    }

    /// True if at least one peer is currently visible on `kind` — the bridge
    /// manager (C11) uses this to decide whether forwarding onto a transport
    /// would reach anyone at all.
    pub fn has_peers_on(&self, kind: TransportKind) -> bool {
        let now = self.time_source.now();
        self.peers
            .values()
            .any(|record| record.visible_transports(now).contains(&kind))
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    /// Drop peers that have gone stale on every transport (§4.9).
    pub fn prune_stale(&mut self) {
        let now = self.time_source.now();
        self.peers.retain(|_, record| record.is_visible(now));
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SystemTimeSource;

    #[test]
    fn test_observe_and_select_transport() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let peer = PeerId::new([1; 8]);

        registry.observe(peer, TransportKind::Ble, Some(-60));
        assert_eq!(registry.select_transport(peer), Some(TransportKind::Ble));

        registry.observe(peer, TransportKind::Peer, Some(-40));
        // Peer transport has a better RSSI, same fresh recency/no delivery
        // history yet, so it should win.
        assert_eq!(registry.select_transport(peer), Some(TransportKind::Peer));
    }

    #[test]
    fn test_mark_delivery_affects_selection() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let peer = PeerId::new([2; 8]);

        registry.observe(peer, TransportKind::Ble, None);
        registry.observe(peer, TransportKind::Peer, None);

        for _ in 0..10 {
            registry.mark_delivery(peer, TransportKind::Ble, false);
        }
        for _ in 0..10 {
            registry.mark_delivery(peer, TransportKind::Peer, true);
        }

        assert_eq!(registry.select_transport(peer), Some(TransportKind::Peer));
    }

    #[test]
    fn test_can_bridge_requires_non_overlapping_sets() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let p1 = PeerId::new([3; 8]);
        let p2 = PeerId::new([4; 8]);

        assert!(!registry.can_bridge());

        registry.observe(p1, TransportKind::Ble, None);
        assert!(!registry.can_bridge());

        registry.observe(p2, TransportKind::Peer, None);
        assert!(registry.can_bridge());
    }

    #[test]
    fn test_can_bridge_false_when_same_peer_on_both() {
        let mut registry = PeerRegistry::new(SystemTimeSource::new());
        let p1 = PeerId::new([5; 8]);

        registry.observe(p1, TransportKind::Ble, None);
        registry.observe(p1, TransportKind::Peer, None);
        assert!(!registry.can_bridge());
    }
}
