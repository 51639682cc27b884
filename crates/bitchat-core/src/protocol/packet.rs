//! BitChat packet format and binary wire protocol
//!
//! Implements the fixed 16-byte header (version, type, ttl, timestamp, flags,
//! payloadLen) plus the variable sender/recipient/route/payload/signature
//! fields that follow it.

use alloc::format;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::protocol::crypto::IdentityKeyPair;
use crate::types::{PeerId, Timestamp, Ttl};
use crate::{BitchatError, Result};

// ----------------------------------------------------------------------------
// Protocol Constants
// ----------------------------------------------------------------------------

/// Current (and only) protocol version
pub const CURRENT_PROTOCOL_VERSION: u8 = 1;

/// Fixed header size: version(1) + type(1) + ttl(1) + timestamp(8) + flags(1) + payloadLen(4)
pub const HEADER_SIZE: usize = 16;

/// Maximum payload size, enforced by the decoder regardless of the field's full u32 range
pub const MAX_PAYLOAD_SIZE: usize = 1_048_576; // 1 MiB

// ----------------------------------------------------------------------------
// Message Types
// ----------------------------------------------------------------------------

/// Wire message types. Unknown values are dropped by the decoder rather than
/// treated as a fatal parse error, so new types can be introduced without
/// breaking older nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Peer presence broadcast
    Announce = 0x01,
    /// Public or private chat message
    Message = 0x02,
    /// Graceful peer departure
    Leave = 0x03,
    /// Noise XX handshake message
    NoiseHandshake = 0x10,
    /// Container for all Noise-encrypted payloads
    NoiseEncrypted = 0x11,
    /// Fragment of a larger message
    Fragment = 0x20,
}

impl MessageType {
    /// Convert from raw byte value. Returns `None` for values outside the
    /// known set so callers can drop the packet instead of failing parse.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(MessageType::Announce),
            0x02 => Some(MessageType::Message),
            0x03 => Some(MessageType::Leave),
            0x10 => Some(MessageType::NoiseHandshake),
            0x11 => Some(MessageType::NoiseEncrypted),
            0x20 => Some(MessageType::Fragment),
            _ => None,
        }
    }

    /// Convert to raw byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ----------------------------------------------------------------------------
// Packet Flags
// ----------------------------------------------------------------------------

/// Flags controlling optional packet fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFlags(u8);

impl PacketFlags {
    /// No optional fields present
    pub const NONE: Self = Self(0x00);

    /// Recipient ID field is present
    pub const HAS_RECIPIENT: Self = Self(0x01);

    /// Signature field is present
    pub const HAS_SIGNATURE: Self = Self(0x02);

    /// Payload is compressed with zlib
    pub const IS_COMPRESSED: Self = Self(0x04);

    /// Route field is present (reserved for future use)
    pub const HAS_ROUTE: Self = Self(0x08);

    /// Create flags from raw byte
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Get raw byte value
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn has_recipient(self) -> bool {
        (self.0 & Self::HAS_RECIPIENT.0) != 0
    }

    pub const fn has_signature(self) -> bool {
        (self.0 & Self::HAS_SIGNATURE.0) != 0
    }

    pub const fn is_compressed(self) -> bool {
        (self.0 & Self::IS_COMPRESSED.0) != 0
    }

    pub const fn has_route(self) -> bool {
        (self.0 & Self::HAS_ROUTE.0) != 0
    }

    pub fn with_recipient(mut self) -> Self {
        self.0 |= Self::HAS_RECIPIENT.0;
        self
    }

    pub fn with_signature(mut self) -> Self {
        self.0 |= Self::HAS_SIGNATURE.0;
        self
    }

    pub fn with_compression(mut self) -> Self {
        self.0 |= Self::IS_COMPRESSED.0;
        self
    }

    pub fn with_route(mut self) -> Self {
        self.0 |= Self::HAS_ROUTE.0;
        self
    }

    pub fn without_compression(mut self) -> Self {
        self.0 &= !Self::IS_COMPRESSED.0;
        self
    }
}

// ----------------------------------------------------------------------------
// Packet Header
// ----------------------------------------------------------------------------

/// Fixed 16-byte packet header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub version: u8,
    pub message_type: MessageType,
    pub ttl: Ttl,
    pub timestamp: Timestamp,
    pub flags: PacketFlags,
    pub payload_length: u32,
}

impl PacketHeader {
    pub fn new(
        message_type: MessageType,
        ttl: Ttl,
        timestamp: Timestamp,
        flags: PacketFlags,
        payload_length: u32,
    ) -> Self {
        Self {
            version: CURRENT_PROTOCOL_VERSION,
            message_type,
            ttl,
            timestamp,
            flags,
            payload_length,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CURRENT_PROTOCOL_VERSION {
            return Err(BitchatError::invalid_packet("Unsupported protocol version"));
        }

        if self.payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(BitchatError::invalid_packet("Payload exceeds 1 MiB limit"));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.push(self.version);
        bytes.push(self.message_type.as_u8());
        bytes.push(self.ttl.value());
        bytes.extend_from_slice(&self.timestamp.as_millis().to_be_bytes());
        bytes.push(self.flags.as_u8());
        bytes.extend_from_slice(&self.payload_length.to_be_bytes());

        Ok(bytes)
    }

    /// Parse a header, returning `Ok(None)` for an unrecognized message type
    /// so the caller can drop the packet (forward-compat) rather than error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.len() < HEADER_SIZE {
            return Err(BitchatError::invalid_packet("Packet too short for header"));
        }

        let version = bytes[0];
        if version != CURRENT_PROTOCOL_VERSION {
            return Err(BitchatError::invalid_packet("Unsupported protocol version"));
        }

        let message_type = match MessageType::from_u8(bytes[1]) {
            Some(mt) => mt,
            None => return Ok(None),
        };

        let ttl = Ttl::new(bytes[2]);

        let timestamp_bytes: [u8; 8] = bytes[3..11]
            .try_into()
            .map_err(|_| BitchatError::invalid_packet("Invalid timestamp"))?;
        let timestamp = Timestamp::new(u64::from_be_bytes(timestamp_bytes));

        let flags = PacketFlags::new(bytes[11]);

        let length_bytes: [u8; 4] = bytes[12..16]
            .try_into()
            .map_err(|_| BitchatError::invalid_packet("Invalid payload length"))?;
        let payload_length = u32::from_be_bytes(length_bytes);

        let header = Self {
            version,
            message_type,
            ttl,
            timestamp,
            flags,
            payload_length,
        };

        header.validate()?;
        Ok(Some(header))
    }
}

// ----------------------------------------------------------------------------
// BitChat Packet
// ----------------------------------------------------------------------------

/// Complete BitChat packet with header and variable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitchatPacket {
    pub header: PacketHeader,
    /// Sender peer ID (always present)
    pub sender_id: PeerId,
    /// Optional recipient peer ID
    pub recipient_id: Option<PeerId>,
    /// Optional route (reserved for future use)
    pub route: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    /// Optional Ed25519 signature
    #[serde(with = "signature_serde")]
    pub signature: Option<[u8; 64]>,
}

impl BitchatPacket {
    pub fn new_simple(message_type: MessageType, sender_id: PeerId, payload: Vec<u8>) -> Self {
        let flags = PacketFlags::NONE;
        let header = PacketHeader::new(
            message_type,
            Ttl::DEFAULT,
            Timestamp::now(),
            flags,
            payload.len() as u32,
        );

        Self {
            header,
            sender_id,
            recipient_id: None,
            route: None,
            payload,
            signature: None,
        }
    }

    pub fn new(
        message_type: MessageType,
        sender_id: PeerId,
        recipient_id: Option<PeerId>,
        timestamp: Timestamp,
        payload: Vec<u8>,
        flags: PacketFlags,
        ttl: Ttl,
    ) -> Result<Self> {
        let mut final_flags = flags;
        if recipient_id.is_some() {
            final_flags = final_flags.with_recipient();
        }

        let header = PacketHeader::new(message_type, ttl, timestamp, final_flags, payload.len() as u32);

        Ok(Self {
            header,
            sender_id,
            recipient_id,
            route: None,
            payload,
            signature: None,
        })
    }

    pub fn with_recipient(mut self, recipient_id: PeerId) -> Self {
        self.recipient_id = Some(recipient_id);
        self.header.flags = self.header.flags.with_recipient();
        self
    }

    pub fn with_signature(mut self, signature: [u8; 64]) -> Self {
        self.signature = Some(signature);
        self.header.flags = self.header.flags.with_signature();
        self
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.header.ttl = ttl;
        self
    }

    /// Decrement TTL for relaying, returning `None` when it would hit zero
    /// (caller must stop forwarding in that case, per router TTL monotonicity).
    pub fn decremented_ttl(&self) -> Option<Self> {
        let ttl = self.header.ttl.decrement()?;
        let mut relayed = self.clone();
        relayed.header.ttl = ttl;
        Some(relayed)
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient_id.is_none() || self.recipient_id.map(|r| r.is_broadcast()).unwrap_or(false)
    }

    pub fn is_private(&self) -> bool {
        !self.is_broadcast()
    }

    pub fn validate(&self) -> Result<()> {
        self.header.validate()?;

        if self.payload.len() != self.header.payload_length as usize {
            return Err(BitchatError::invalid_packet("Payload length mismatch"));
        }

        if self.header.flags.has_recipient() && self.recipient_id.is_none() {
            return Err(BitchatError::invalid_packet(
                "Recipient flag set but no recipient",
            ));
        }

        if !self.header.flags.has_recipient() && self.recipient_id.is_some() {
            return Err(BitchatError::invalid_packet(
                "Recipient present but flag not set",
            ));
        }

        if self.header.flags.has_signature() && self.signature.is_none() {
            return Err(BitchatError::invalid_packet(
                "Signature flag set but no signature",
            ));
        }

        if !self.header.flags.has_signature() && self.signature.is_some() {
            return Err(BitchatError::invalid_packet(
                "Signature present but flag not set",
            ));
        }

        Ok(())
    }

    /// Sign the packet using an Ed25519 identity keypair
    pub fn sign(&mut self, identity_keypair: &IdentityKeyPair) -> Result<()> {
        let canonical_bytes = self.canonical_bytes_for_signing()?;
        let signature = identity_keypair.sign(&canonical_bytes);
        self.signature = Some(signature);
        self.header.flags = self.header.flags.with_signature();
        Ok(())
    }

    /// Verify the packet's signature using an Ed25519 public key
    pub fn verify_signature(&self, public_key: &[u8; 32]) -> Result<()> {
        let signature = self
            .signature
            .ok_or_else(|| BitchatError::invalid_packet("No signature present for verification"))?;

        let canonical_bytes = self.canonical_bytes_for_signing()?;
        IdentityKeyPair::verify(public_key, &canonical_bytes, &signature)?;
        Ok(())
    }

    /// Canonical bytes for packet-level signing/verification: excludes the
    /// signature and TTL (TTL changes on every relay hop). This is distinct
    /// from the PeerIdentity binding signature computed in `protocol::announce`.
    fn canonical_bytes_for_signing(&self) -> Result<Vec<u8>> {
        let mut hasher = Sha256::new();

        hasher.update(b"bitchat-packet-v1");
        hasher.update([self.header.version]);
        hasher.update([self.header.message_type.as_u8()]);
        hasher.update(self.header.timestamp.as_millis().to_be_bytes());
        hasher.update(self.sender_id.as_bytes());

        if let Some(recipient_id) = &self.recipient_id {
            hasher.update(recipient_id.as_bytes());
        }

        hasher.update(&self.payload);

        Ok(hasher.finalize().to_vec())
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    pub fn sender_id(&self) -> PeerId {
        self.sender_id
    }

    pub fn recipient_id(&self) -> Option<PeerId> {
        self.recipient_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Update payload length in header (internal use, called after
    /// compression/decompression mutates `payload` in place)
    pub(crate) fn update_payload_length(&mut self) -> Result<()> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(BitchatError::invalid_packet(format!(
                "Payload exceeds {} byte limit",
                MAX_PAYLOAD_SIZE
            )));
        }
        self.header.payload_length = self.payload.len() as u32;
        Ok(())
    }
}

mod signature_serde {
    use alloc::vec::Vec;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<[u8; 64]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(array) => serializer.serialize_some(&array[..]),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 64]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::Deserialize;

        let opt_vec: Option<Vec<u8>> = Option::deserialize(deserializer)?;
        match opt_vec {
            Some(vec) => {
                if vec.len() == 64 {
                    let mut array = [0u8; 64];
                    array.copy_from_slice(&vec);
                    Ok(Some(array))
                } else {
                    Err(serde::de::Error::invalid_length(vec.len(), &"64 bytes"))
                }
            }
            None => Ok(None),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_conversion() {
        assert_eq!(MessageType::from_u8(0x01), Some(MessageType::Announce));
        assert_eq!(MessageType::Message.as_u8(), 0x02);
        assert_eq!(MessageType::from_u8(0xFF), None);
    }

    #[test]
    fn test_packet_flags() {
        let flags = PacketFlags::NONE.with_recipient().with_signature();

        assert!(flags.has_recipient());
        assert!(flags.has_signature());
        assert!(!flags.is_compressed());
        assert_eq!(flags.as_u8(), 0x03);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = PacketHeader::new(
            MessageType::Message,
            Ttl::new(5),
            Timestamp::new(1234567890000),
            PacketFlags::NONE.with_recipient(),
            100,
        );

        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let parsed = PacketHeader::from_bytes(&bytes).unwrap().unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_unknown_message_type_is_dropped_not_fatal() {
        let mut header = PacketHeader::new(
            MessageType::Message,
            Ttl::new(5),
            Timestamp::new(0),
            PacketFlags::NONE,
            0,
        )
        .to_bytes()
        .unwrap();
        header[1] = 0xAA; // unused type byte
        assert!(PacketHeader::from_bytes(&header).unwrap().is_none());
    }

    #[test]
    fn test_payload_over_1mib_rejected() {
        let header = PacketHeader::new(
            MessageType::Message,
            Ttl::DEFAULT,
            Timestamp::now(),
            PacketFlags::NONE,
            (MAX_PAYLOAD_SIZE + 1) as u32,
        );
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_packet_creation() {
        let sender = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let recipient = PeerId::new([8, 7, 6, 5, 4, 3, 2, 1]);
        let payload = b"Hello, BitChat!".to_vec();

        let packet = BitchatPacket::new_simple(MessageType::Message, sender, payload.clone())
            .with_recipient(recipient);

        assert_eq!(packet.sender_id, sender);
        assert_eq!(packet.recipient_id, Some(recipient));
        assert_eq!(packet.payload, payload);
        assert!(packet.header.flags.has_recipient());
        assert!(packet.is_private());
        assert!(!packet.is_broadcast());

        packet.validate().unwrap();
    }

    #[test]
    fn test_broadcast_packet() {
        let sender = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let payload = b"Broadcast message".to_vec();

        let packet = BitchatPacket::new_simple(MessageType::Announce, sender, payload);

        assert!(packet.is_broadcast());
        assert!(!packet.is_private());
        assert!(!packet.header.flags.has_recipient());

        packet.validate().unwrap();
    }

    #[test]
    fn test_decremented_ttl_stops_at_zero() {
        let sender = PeerId::new([1; 8]);
        let packet =
            BitchatPacket::new_simple(MessageType::Message, sender, vec![]).with_ttl(Ttl::new(1));
        let relayed = packet.decremented_ttl().unwrap();
        assert_eq!(relayed.header.ttl.value(), 0);
        assert!(relayed.decremented_ttl().is_none());
    }
}
