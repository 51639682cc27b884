//! BitChat Core Protocol Implementation
//!
//! This crate provides the foundational types, cryptographic primitives, and
//! serialization for the BitChat peer-to-peer mesh messaging protocol. It is
//! designed to be `no_std` compatible and work across both native and
//! WebAssembly targets.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod errors;
pub mod types;
pub mod config;
pub mod internal;
pub mod protocol;
pub mod identity;
pub mod channel;
pub mod transport;
pub mod peer;

#[cfg(feature = "std")]
pub mod transport_task;
#[cfg(feature = "task-logging")]
pub mod task_logging;
#[cfg(feature = "monitoring")]
pub mod monitoring;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use errors::{BitchatError, BitchatResult, Result};
pub use types::{Fingerprint, PeerId, TimeSource, Timestamp, Ttl};

#[cfg(feature = "std")]
pub use types::SystemTimeSource;

pub use protocol::packet::{BitchatPacket, MessageType, PacketFlags, PacketHeader};
pub use protocol::crypto::{generate_fingerprint, IdentityKeyPair, NoiseHandshake, NoiseKeyPair, NoiseTransport};
pub use protocol::session::{NoiseSession, SessionState};
pub use protocol::router::{RouteOutcome, Router, RouterSeen};

pub use channel::ChannelTransportType;
pub use transport::{Transport, TransportEvent, TransportKind};
pub use peer::{PeerRecord, PeerRegistry};
