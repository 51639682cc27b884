//! Session manager for the BitChat runtime
//!
//! This module contains the stateful `NoiseSessionManager` that owns the
//! per-peer session map, drives the lazy-handshake queue, and sweeps
//! handshake timeouts, failed back-off, and due rekeys on each `tick`.

use std::collections::HashMap;
use core::time::Duration;

use bitchat_core::{
    BitchatError, BitchatResult, PeerId,
    internal::{SessionError, NoiseKeyPair, NoiseSession, SessionState, TimeSource, Fingerprint},
};

// ----------------------------------------------------------------------------
// Session Timeout Configuration
// ----------------------------------------------------------------------------

/// Session timeout configuration
#[derive(Debug, Clone)]
pub struct SessionTimeouts {
    /// Maximum idle time before an established session is cleaned up
    pub idle_timeout: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300), // 5 minutes
        }
    }
}

// ----------------------------------------------------------------------------
// Session Manager
// ----------------------------------------------------------------------------

/// Manages the lazy-handshake session lifecycle with every peer.
#[derive(Debug)]
pub struct NoiseSessionManager<T: TimeSource> {
    local_key: NoiseKeyPair,
    sessions: HashMap<PeerId, NoiseSession>,
    timeouts: SessionTimeouts,
    time_source: T,
}

impl<T: TimeSource> NoiseSessionManager<T> {
    pub fn new(local_key: NoiseKeyPair, time_source: T, timeouts: SessionTimeouts) -> Self {
        Self {
            local_key,
            sessions: HashMap::new(),
            timeouts,
            time_source,
        }
    }

    pub fn with_timeouts(
        local_key: NoiseKeyPair,
        timeouts: SessionTimeouts,
        time_source: T,
    ) -> Self {
        Self {
            local_key,
            sessions: HashMap::new(),
            timeouts,
            time_source,
        }
    }

    /// A confidential send was requested for `peer_id`. If no session exists,
    /// one is created in `None` and immediately queued (`HandshakeQueued`).
    /// If the queued session has not yet sent its first handshake message,
    /// this sends it now and returns the bytes to put on the wire.
    pub fn request_outbound(&mut self, peer_id: PeerId) -> BitchatResult<Option<Vec<u8>>> {
        let session = self
            .sessions
            .entry(peer_id)
            .or_insert_with(|| NoiseSession::new_idle(peer_id, &self.time_source));

        match session.state() {
            SessionState::None => {
                session.queue_outbound();
                let msg = session.start_outbound(&self.local_key, &self.time_source)?;
                Ok(Some(msg))
            }
            SessionState::HandshakeQueued => {
                let msg = session.start_outbound(&self.local_key, &self.time_source)?;
                Ok(Some(msg))
            }
            _ => Ok(None),
        }
    }

    /// Accept an inbound handshake initiation from a peer with no existing session.
    pub fn create_inbound(&mut self, peer_id: PeerId) -> BitchatResult<&mut NoiseSession> {
        let session = NoiseSession::start_inbound(peer_id, &self.local_key, &self.time_source)?;
        self.sessions.insert(peer_id, session);
        self.sessions
            .get_mut(&peer_id)
            .ok_or_else(|| BitchatError::Session(SessionError::SessionNotFound {
                peer_id: peer_id.to_string(),
            }))
    }

    pub fn get_session(&self, peer_id: &PeerId) -> Option<&NoiseSession> {
        self.sessions.get(peer_id)
    }

    pub fn get_session_mut(&mut self, peer_id: &PeerId) -> Option<&mut NoiseSession> {
        self.sessions.get_mut(peer_id)
    }

    pub fn remove_session(&mut self, peer_id: &PeerId) -> Option<NoiseSession> {
        self.sessions.remove(peer_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = (&PeerId, &NoiseSession)> {
        self.sessions.iter()
    }

    /// Count of sessions in each state: (queued, handshaking, established, failed)
    pub fn session_counts(&self) -> (usize, usize, usize, usize) {
        let mut queued = 0;
        let mut handshaking = 0;
        let mut established = 0;
        let mut failed = 0;

        for session in self.sessions.values() {
            match session.state() {
                SessionState::None => {}
                SessionState::HandshakeQueued => queued += 1,
                SessionState::Handshaking => handshaking += 1,
                SessionState::Established => established += 1,
                SessionState::Failed { .. } => failed += 1,
            }
        }

        (queued, handshaking, established, failed)
    }

    /// Sweep all sessions: fail timed-out handshakes, drop failed sessions
    /// back to `None` once their back-off has elapsed, trigger due rekeys,
    /// and evict idle established sessions past `idle_timeout`.
    pub fn tick(&mut self) {
        let mut rekeys_due = Vec::new();
        let mut to_evict = Vec::new();

        for (peer_id, session) in self.sessions.iter_mut() {
            if session.is_handshake_timed_out(&self.time_source) {
                session.mark_failed("handshake timeout");
                continue;
            }

            session.reset_after_backoff(&self.time_source);

            if session.needs_rekey(&self.time_source) {
                rekeys_due.push(*peer_id);
                continue;
            }

            if session.is_established()
                && session.time_since_activity(&self.time_source) > self.timeouts.idle_timeout
            {
                to_evict.push(*peer_id);
            }
        }

        for peer_id in rekeys_due {
            if let Some(session) = self.sessions.get_mut(&peer_id) {
                let _ = session.start_rekey(&self.local_key, &self.time_source);
            }
        }

        for peer_id in to_evict {
            self.sessions.remove(&peer_id);
        }
    }

    pub fn local_fingerprint(&self) -> Fingerprint {
        self.local_key.fingerprint()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_core::internal::NoiseKeyPair;
    use bitchat_core::SystemTimeSource;

    #[cfg(feature = "std")]
    #[test]
    fn test_session_manager_lazy_handshake() {
        let key = NoiseKeyPair::generate();
        let time_source = SystemTimeSource;
        let mut manager = NoiseSessionManager::new(key, time_source, SessionTimeouts::default());

        let peer_id = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);

        let first = manager.request_outbound(peer_id).unwrap();
        assert!(first.is_some());

        let session = manager.get_session(&peer_id).unwrap();
        assert_eq!(*session.state(), SessionState::Handshaking);

        let (queued, handshaking, established, failed) = manager.session_counts();
        assert_eq!(queued, 0);
        assert_eq!(handshaking, 1);
        assert_eq!(established, 0);
        assert_eq!(failed, 0);
    }
}
