//! Wire format compatibility tests
//!
//! Pins the binary layout of [`PacketHeader`]/[`BitchatPacket`] and
//! [`FragmentHeader`] so a change to the codec shows up here first.

use bitchat_core::protocol::fragmentation::FragmentHeader;
use bitchat_core::protocol::{BitchatPacket, MessageType, PacketFlags, PacketHeader, WireFormat};
use bitchat_core::types::{PeerId, Timestamp, Ttl};

#[test]
fn header_is_16_bytes_with_u32_payload_length() {
    let header = PacketHeader::new(
        MessageType::Message,
        Ttl::new(7),
        Timestamp::new(0x0102030405060708),
        PacketFlags::new(0),
        100,
    );

    let bytes = header.to_bytes().unwrap();
    assert_eq!(bytes.len(), 16, "version+type+ttl+timestamp+flags+payloadLen");

    assert_eq!(bytes[0], 1); // version
    assert_eq!(bytes[1], MessageType::Message as u8);
    assert_eq!(bytes[2], 7); // ttl
    assert_eq!(&bytes[3..11], &0x0102030405060708u64.to_be_bytes()); // timestamp
    assert_eq!(bytes[11], 0); // flags
    assert_eq!(&bytes[12..16], &100u32.to_be_bytes()); // payload length
}

#[test]
fn message_type_values() {
    assert_eq!(MessageType::Announce as u8, 0x01);
    assert_eq!(MessageType::Message as u8, 0x02);
    assert_eq!(MessageType::Leave as u8, 0x03);
    assert_eq!(MessageType::NoiseHandshake as u8, 0x10);
    assert_eq!(MessageType::NoiseEncrypted as u8, 0x11);
    assert_eq!(MessageType::Fragment as u8, 0x20);
}

#[test]
fn fragment_header_is_13_bytes() {
    let header = FragmentHeader::new(0x1234_5678_90AB_CDEF, 5, 10, MessageType::Message.as_u8());
    let bytes = header.to_bytes();
    assert_eq!(bytes.len(), 13);

    assert_eq!(u64::from_be_bytes(bytes[0..8].try_into().unwrap()), 0x1234_5678_90AB_CDEF);
    assert_eq!(u16::from_be_bytes(bytes[8..10].try_into().unwrap()), 5);
    assert_eq!(u16::from_be_bytes(bytes[10..12].try_into().unwrap()), 10);
    assert_eq!(bytes[12], MessageType::Message.as_u8());

    let roundtripped = FragmentHeader::from_bytes(&bytes).unwrap();
    assert_eq!(roundtripped, header);
}

#[test]
fn packet_round_trips_through_wire_format() {
    let sender = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
    let payload = b"Hello, BitChat!".to_vec();
    let packet = BitchatPacket::new_simple(MessageType::Message, sender, payload.clone());

    let encoded = WireFormat::encode(&packet).unwrap();
    let decoded = WireFormat::decode(&encoded).unwrap().expect("known message type decodes");

    assert_eq!(decoded.header.version, packet.header.version);
    assert_eq!(decoded.header.message_type as u8, packet.header.message_type as u8);
    assert_eq!(decoded.sender_id, sender);
    assert_eq!(decoded.payload, payload);

    // 16-byte header + 8-byte sender id + payload, no recipient/route/signature
    assert_eq!(encoded.len(), 16 + 8 + payload.len());
}

#[test]
fn payload_beyond_one_mebibyte_is_rejected() {
    let sender = PeerId::new([1, 2, 3, 4, 5, 6, 7, 8]);
    let oversized = vec![0u8; bitchat_core::protocol::packet::MAX_PAYLOAD_SIZE + 1];
    let packet = BitchatPacket::new_simple(MessageType::Message, sender, oversized);

    assert!(WireFormat::encode(&packet).is_err());
}
