//! BitChat Protocol Module
//!
//! Core wire format, crypto, and session-layer pieces of the mesh engine:
//! - `packet`/`wire`: binary codec, header, padding/compression
//! - `crypto`: cryptographic primitives and key management
//! - `session`: Noise session state machine and handshakes
//! - `fragmentation`: link-MTU fragmentation and reassembly
//! - `announce`: peer identity announcement and ephemeral-ID rotation
//! - `delivery`/`acknowledgments`: delivery tracking and receipts
//! - `tlv`: typed binary fields shared by announce/delivery payloads
//! - `router`: TTL-bounded flood router and duplicate suppression (C7)
//!
//! Modules not yet named by any current operation
//! (`capabilities`, `connection_state`, `file_transfer`, `group_messaging`,
//! `message_store`, `session_sync`) are retained as in-tree reference
//! pending the final trim pass; several are still wired into
//! `config.rs`/`channel` and cannot be dropped independently of those.

pub mod packet;
pub mod wire;
pub mod crypto;
pub mod session;
pub mod fragmentation;
pub mod announce;
pub mod message;
pub mod tlv;
pub mod delivery;
pub mod acknowledgments;
pub mod router;

pub mod capabilities;
pub mod connection_state;
pub mod file_transfer;
pub mod group_messaging;
pub mod message_store;
pub mod session_sync;

pub use packet::{BitchatPacket, MessageType, PacketFlags, PacketHeader};
pub use wire::WireFormat;
pub use crypto::{NoiseKeyPair, IdentityKeyPair, NoiseHandshake, NoiseTransport, generate_fingerprint};
pub use session::{NoiseSession, SessionState};
pub use delivery::{DeliveryConfig, DeliveryStatus, TrackedMessage, DeliveryAttempt};
pub use router::{RouteOutcome, Router, RouterSeen};

pub use message_store::{MessageId, ContentAddressedMessage, ConversationId, MessageStore, MessageStoreStats};
pub use connection_state::{ConnectionState, ConnectionEvent, StateTransition, StateTransitionError, AuditEntry, SessionParams};
