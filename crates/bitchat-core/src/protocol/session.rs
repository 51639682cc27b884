//! Session management types for the BitChat protocol
//!
//! This module provides types for session management including session states
//! and individual session handling. The stateful session manager (peer-keyed
//! map, tick-driven rekey/backoff scanning) lives in the bitchat-runtime crate.

use alloc::vec::Vec;
use core::time::Duration;

cfg_if::cfg_if! {
    if #[cfg(not(feature = "std"))] {
        use alloc::string::{String, ToString};
    } else {
        use std::string::{String, ToString};
    }
}

use crate::protocol::crypto::{NoiseHandshake, NoiseKeyPair, NoiseTransport};
use crate::types::{Fingerprint, PeerId, TimeSource, Timestamp};
use crate::{internal::SessionError, BitchatError, Result};

/// Messages-since-handshake rekey countdown starts here and only ever counts down.
pub const REKEY_COUNTDOWN_START: u32 = u32::MAX;

/// Wall-clock cap on session lifetime before a rekey is forced, regardless of
/// how many messages have been exchanged.
pub const REKEY_WALL_CLOCK_CAP_SECS: u64 = 3600;

/// Handshake must complete within this window or the session is failed.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// How long a `Failed` session sits before it is eligible to fall back to `None`.
pub const FAILED_BACKOFF_SECS: u64 = 5;

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Session states in the per-peer connection lifecycle.
///
/// ```text
/// None ──(need send)──▶ HandshakeQueued
/// HandshakeQueued ──(send init)──▶ Handshaking
/// Handshaking ──(complete)──▶ Established
/// Handshaking ──(timeout or auth fail)──▶ Failed ──(back-off)──▶ None
/// Established ──(rekey countdown 0 or nonce near wrap)──▶ Handshaking
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session material exists yet; nothing has been sent or received.
    None,
    /// A confidential send was requested; a handshake has been enqueued but
    /// not yet initiated on the wire.
    HandshakeQueued,
    /// Performing the Noise handshake.
    Handshaking,
    /// Handshake complete, ready for encrypted communication.
    Established,
    /// Session failed (handshake timeout, auth failure, decrypt failure).
    Failed { reason: String },
}

impl SessionState {
    pub fn is_established(&self) -> bool {
        matches!(self, SessionState::Established)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            SessionState::None => "None",
            SessionState::HandshakeQueued => "HandshakeQueued",
            SessionState::Handshaking => "Handshaking",
            SessionState::Established => "Established",
            SessionState::Failed { .. } => "Failed",
        }
    }
}

// ----------------------------------------------------------------------------
// Noise Session
// ----------------------------------------------------------------------------

/// A single Noise protocol session with a peer.
#[derive(Debug)]
pub struct NoiseSession {
    peer_id: PeerId,
    peer_fingerprint: Option<Fingerprint>,
    state: SessionState,
    handshake: Option<NoiseHandshake>,
    transport: Option<NoiseTransport>,
    created_at: Timestamp,
    last_activity: Timestamp,
    /// Timestamp the current `Handshaking` attempt started, for the 10 s timeout.
    handshake_started_at: Timestamp,
    /// Timestamp the session entered `Failed`, for the back-off window.
    failed_at: Option<Timestamp>,
    /// Messages-since-handshake countdown; hits zero and a rekey is due.
    rekey_countdown: u32,
    /// Timestamp of the last (re)key, for the wall-clock rekey cap.
    last_rekey: Timestamp,
}

impl NoiseSession {
    /// Create a session in `None` state: no handshake material yet, nothing queued.
    pub fn new_idle<T: TimeSource>(peer_id: PeerId, time_source: &T) -> Self {
        let now = time_source.now();
        Self {
            peer_id,
            peer_fingerprint: None,
            state: SessionState::None,
            handshake: None,
            transport: None,
            created_at: now,
            last_activity: now,
            handshake_started_at: now,
            failed_at: None,
            rekey_countdown: REKEY_COUNTDOWN_START,
            last_rekey: now,
        }
    }

    /// Enqueue a handshake because a confidential send is needed. Only valid
    /// from `None`; re-queuing an already-queued or active session is a no-op.
    pub fn queue_outbound(&mut self) {
        if matches!(self.state, SessionState::None) {
            self.state = SessionState::HandshakeQueued;
        }
    }

    /// Move a queued (or idle) session into `Handshaking` as the initiator
    /// and produce the first handshake message.
    pub fn start_outbound<T: TimeSource>(
        &mut self,
        local_key: &NoiseKeyPair,
        time_source: &T,
    ) -> Result<Vec<u8>> {
        if !matches!(
            self.state,
            SessionState::None | SessionState::HandshakeQueued
        ) {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "None or HandshakeQueued".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let handshake = NoiseHandshake::initiator(local_key)?;
        self.handshake = Some(handshake);
        self.transport = None;
        self.state = SessionState::Handshaking;
        let now = time_source.now();
        self.handshake_started_at = now;
        self.update_activity(time_source);

        let payload = self
            .handshake
            .as_mut()
            .expect("handshake just set")
            .write_message(b"")?;
        Ok(payload)
    }

    /// Accept an inbound handshake initiation, entering `Handshaking` as the responder.
    pub fn start_inbound<T: TimeSource>(
        peer_id: PeerId,
        local_key: &NoiseKeyPair,
        time_source: &T,
    ) -> Result<Self> {
        let handshake = NoiseHandshake::responder(local_key)?;
        let now = time_source.now();

        Ok(Self {
            peer_id,
            peer_fingerprint: None,
            state: SessionState::Handshaking,
            handshake: Some(handshake),
            transport: None,
            created_at: now,
            last_activity: now,
            handshake_started_at: now,
            failed_at: None,
            rekey_countdown: REKEY_COUNTDOWN_START,
            last_rekey: now,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn peer_fingerprint(&self) -> Option<&Fingerprint> {
        self.peer_fingerprint.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_established(&self) -> bool {
        self.state.is_established()
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether the in-flight handshake has exceeded its timeout window.
    pub fn is_handshake_timed_out<T: TimeSource>(&self, time_source: &T) -> bool {
        if !matches!(self.state, SessionState::Handshaking) {
            return false;
        }
        let now = time_source.now();
        let elapsed_ms = now
            .as_millis()
            .saturating_sub(self.handshake_started_at.as_millis());
        elapsed_ms >= HANDSHAKE_TIMEOUT_SECS * 1000
    }

    /// Whether a `Failed` session has sat long enough to fall back to `None`.
    pub fn backoff_elapsed<T: TimeSource>(&self, time_source: &T) -> bool {
        let Some(failed_at) = self.failed_at else {
            return false;
        };
        let now = time_source.now();
        let elapsed_ms = now.as_millis().saturating_sub(failed_at.as_millis());
        elapsed_ms >= FAILED_BACKOFF_SECS * 1000
    }

    /// Drop a `Failed` session back to `None` once its back-off has elapsed.
    /// No-op if not `Failed` or the back-off has not yet elapsed.
    pub fn reset_after_backoff<T: TimeSource>(&mut self, time_source: &T) {
        if self.is_failed() && self.backoff_elapsed(time_source) {
            self.state = SessionState::None;
            self.failed_at = None;
        }
    }

    /// Process an inbound handshake message, returning a response to send
    /// back if the protocol requires one.
    pub fn process_handshake_message<T: TimeSource>(
        &mut self,
        input: &[u8],
        time_source: &T,
    ) -> Result<Option<Vec<u8>>> {
        if !matches!(self.state, SessionState::Handshaking) {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Handshaking".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let handshake = self.handshake.as_mut().ok_or_else(|| {
            BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Handshaking".to_string(),
                actual: "no handshake state".to_string(),
            })
        })?;

        let output = match handshake.read_message(input) {
            Ok(output) => output,
            Err(err) => {
                self.mark_failed("handshake authentication failed");
                return Err(err);
            }
        };

        self.finish_handshake_if_done(time_source)?;
        self.update_activity(time_source);

        Ok(if output.is_empty() {
            None
        } else {
            Some(output)
        })
    }

    /// Produce the next handshake message while `Handshaking`.
    pub fn create_handshake_message<T: TimeSource>(
        &mut self,
        payload: &[u8],
        time_source: &T,
    ) -> Result<Vec<u8>> {
        if !matches!(self.state, SessionState::Handshaking) {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Handshaking".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let handshake = self.handshake.as_mut().ok_or_else(|| {
            BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Handshaking".to_string(),
                actual: "no handshake state".to_string(),
            })
        })?;

        let output = handshake.write_message(payload)?;
        self.finish_handshake_if_done(time_source)?;
        self.update_activity(time_source);

        Ok(output)
    }

    fn finish_handshake_if_done<T: TimeSource>(&mut self, time_source: &T) -> Result<()> {
        let is_finished = self
            .handshake
            .as_ref()
            .map(|h| h.is_handshake_finished())
            .unwrap_or(false);
        if !is_finished {
            return Ok(());
        }

        let remote_static = self.handshake.as_ref().and_then(|h| h.get_remote_static());
        if let Some(remote_static) = remote_static {
            use crate::protocol::crypto::generate_fingerprint;
            self.peer_fingerprint = Some(generate_fingerprint(remote_static));
        }

        let handshake = self.handshake.take().ok_or_else(|| {
            BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "handshake available for transport conversion".to_string(),
                actual: "none".to_string(),
            })
        })?;
        self.transport = Some(handshake.into_transport_mode()?);
        self.state = SessionState::Established;
        self.rekey_countdown = REKEY_COUNTDOWN_START;
        self.last_rekey = time_source.now();
        Ok(())
    }

    /// Encrypt a message. Only valid once `Established`; decrements the rekey
    /// countdown and marks the session `Failed` on any cipher error.
    pub fn encrypt<T: TimeSource>(&mut self, plaintext: &[u8], time_source: &T) -> Result<Vec<u8>> {
        if !self.is_established() {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Established".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let result = {
            let transport = self.transport.as_mut().ok_or_else(|| {
                BitchatError::Session(SessionError::InvalidState {
                    peer_id: self.peer_id.to_string(),
                    expected: "Established".to_string(),
                    actual: "no transport state".to_string(),
                })
            })?;
            transport.encrypt(plaintext)
        };

        match &result {
            Ok(_) => {
                self.rekey_countdown = self.rekey_countdown.saturating_sub(1);
                self.update_activity(time_source);
            }
            Err(_) => self.mark_failed("encryption failure"),
        }

        result
    }

    /// Decrypt a message. On failure the session transitions to `Failed` and
    /// the caller is expected to emit a Nack; no plaintext is returned on error.
    pub fn decrypt<T: TimeSource>(
        &mut self,
        ciphertext: &[u8],
        time_source: &T,
    ) -> Result<Vec<u8>> {
        if !self.is_established() {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Established".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let result = {
            let transport = self.transport.as_mut().ok_or_else(|| {
                BitchatError::Session(SessionError::InvalidState {
                    peer_id: self.peer_id.to_string(),
                    expected: "Established".to_string(),
                    actual: "no transport state".to_string(),
                })
            })?;
            transport.decrypt(ciphertext)
        };

        match &result {
            Ok(_) => {
                self.rekey_countdown = self.rekey_countdown.saturating_sub(1);
                self.update_activity(time_source);
            }
            Err(_) => self.mark_failed("decryption failure"),
        }

        result
    }

    /// Whether this established session is due a rekey: countdown exhausted
    /// or the wall-clock cap since the last rekey has elapsed.
    pub fn needs_rekey<T: TimeSource>(&self, time_source: &T) -> bool {
        if !self.is_established() {
            return false;
        }

        if self.rekey_countdown == 0 {
            return true;
        }

        let now = time_source.now();
        let since_rekey_ms = now.as_millis().saturating_sub(self.last_rekey.as_millis());
        since_rekey_ms >= REKEY_WALL_CLOCK_CAP_SECS * 1000
    }

    /// Begin a rekey: `Established` folds directly back into `Handshaking`
    /// as the initiator, per the session transition table.
    pub fn start_rekey<T: TimeSource>(
        &mut self,
        local_key: &NoiseKeyPair,
        time_source: &T,
    ) -> Result<Vec<u8>> {
        if !self.is_established() {
            return Err(BitchatError::Session(SessionError::InvalidState {
                peer_id: self.peer_id.to_string(),
                expected: "Established".to_string(),
                actual: self.state.name().to_string(),
            }));
        }

        let handshake = NoiseHandshake::initiator(local_key)?;
        self.handshake = Some(handshake);
        self.transport = None;
        self.state = SessionState::Handshaking;
        let now = time_source.now();
        self.handshake_started_at = now;
        self.update_activity(time_source);

        self.handshake
            .as_mut()
            .expect("handshake just set")
            .write_message(b"")
    }

    /// Mark session as failed with a reason, clearing any live crypto state.
    pub fn mark_failed(&mut self, reason: &str) {
        self.state = SessionState::Failed {
            reason: reason.to_string(),
        };
        self.handshake = None;
        self.transport = None;
    }

    fn update_activity<T: TimeSource>(&mut self, time_source: &T) {
        let now = time_source.now();
        self.last_activity = now;
        self.failed_at = if self.is_failed() { Some(now) } else { None };
    }

    pub fn time_since_activity<T: TimeSource>(&self, time_source: &T) -> Duration {
        let now = time_source.now();
        let diff = now
            .as_millis()
            .saturating_sub(self.last_activity.as_millis());
        Duration::from_millis(diff)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crypto::NoiseKeyPair;
    use crate::types::SystemTimeSource;

    cfg_if::cfg_if! {
        if #[cfg(feature = "std")] {
            #[test]
            fn test_session_starts_idle_and_queues() {
                let alice_key = NoiseKeyPair::generate();
                let bob_id = PeerId::from_bytes(&NoiseKeyPair::generate().public_key_bytes());
                let time_source = SystemTimeSource;

                let mut session = NoiseSession::new_idle(bob_id, &time_source);
                assert_eq!(*session.state(), SessionState::None);

                session.queue_outbound();
                assert_eq!(*session.state(), SessionState::HandshakeQueued);

                session.start_outbound(&alice_key, &time_source).unwrap();
                assert_eq!(*session.state(), SessionState::Handshaking);
            }

            #[test]
            fn test_full_handshake_and_rekey() {
                let alice_key = NoiseKeyPair::generate();
                let bob_key = NoiseKeyPair::generate();
                let alice_id = PeerId::from_bytes(&alice_key.public_key_bytes());
                let bob_id = PeerId::from_bytes(&bob_key.public_key_bytes());
                let time_source = SystemTimeSource;

                let mut alice_session = NoiseSession::new_idle(bob_id, &time_source);
                alice_session.queue_outbound();
                let msg1 = alice_session.start_outbound(&alice_key, &time_source).unwrap();

                let mut bob_session =
                    NoiseSession::start_inbound(alice_id, &bob_key, &time_source).unwrap();
                let response1 = bob_session
                    .process_handshake_message(&msg1, &time_source)
                    .unwrap();

                let msg2 = response1.unwrap_or_else(|| {
                    bob_session
                        .create_handshake_message(b"", &time_source)
                        .unwrap()
                });
                let response2 = alice_session
                    .process_handshake_message(&msg2, &time_source)
                    .unwrap();

                let msg3 = response2.unwrap_or_else(|| {
                    alice_session
                        .create_handshake_message(b"", &time_source)
                        .unwrap()
                });
                bob_session
                    .process_handshake_message(&msg3, &time_source)
                    .unwrap();

                assert!(alice_session.is_established());
                assert!(bob_session.is_established());
                assert!(alice_session.peer_fingerprint().is_some());
                assert!(bob_session.peer_fingerprint().is_some());

                let plaintext = b"Hello, Bob!";
                let ciphertext = alice_session.encrypt(plaintext, &time_source).unwrap();
                let decrypted = bob_session.decrypt(&ciphertext, &time_source).unwrap();
                assert_eq!(plaintext.as_slice(), decrypted.as_slice());

                assert!(!alice_session.needs_rekey(&time_source));
                alice_session.start_rekey(&alice_key, &time_source).unwrap();
                assert_eq!(*alice_session.state(), SessionState::Handshaking);
            }

            #[test]
            fn test_decrypt_failure_marks_failed() {
                let alice_key = NoiseKeyPair::generate();
                let bob_key = NoiseKeyPair::generate();
                let alice_id = PeerId::from_bytes(&alice_key.public_key_bytes());
                let time_source = SystemTimeSource;

                let mut bob_session =
                    NoiseSession::start_inbound(alice_id, &bob_key, &time_source).unwrap();
                // Force Established state by hand to test decrypt-failure handling
                // without running a full handshake: any attempt to decrypt from a
                // non-established session is itself an InvalidState error, so
                // instead drive this through a real handshake.
                let mut alice_session = NoiseSession::new_idle(bob_session.peer_id(), &time_source);
                alice_session.queue_outbound();
                let msg1 = alice_session.start_outbound(&alice_key, &time_source).unwrap();
                let response1 = bob_session
                    .process_handshake_message(&msg1, &time_source)
                    .unwrap();
                let msg2 = response1.unwrap_or_else(|| {
                    bob_session
                        .create_handshake_message(b"", &time_source)
                        .unwrap()
                });
                let response2 = alice_session
                    .process_handshake_message(&msg2, &time_source)
                    .unwrap();
                let msg3 = response2.unwrap_or_else(|| {
                    alice_session
                        .create_handshake_message(b"", &time_source)
                        .unwrap()
                });
                bob_session
                    .process_handshake_message(&msg3, &time_source)
                    .unwrap();

                let garbage = vec![0u8; 32];
                assert!(bob_session.decrypt(&garbage, &time_source).is_err());
                assert!(bob_session.is_failed());
                assert!(!bob_session.backoff_elapsed(&time_source));
            }
        }
    }
}
