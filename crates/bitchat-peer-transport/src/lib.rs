//! Local peer-to-peer Wi-Fi transport implementation for BitChat
//!
//! This crate provides the higher-bandwidth transport the runtime's transport
//! manager (C10) switches to once enough BLE peers are in range: peers are
//! discovered over mDNS and exchange packets over framed TCP, implementing
//! the `Transport` trait from `bitchat-core`.

pub mod config;
pub mod discovery;
pub mod error;
pub mod transport;

pub use config::{PeerTransportConfig, SERVICE_TYPE};
pub use discovery::{DiscoveredPeer, Discovery};
pub use error::PeerTransportError;
pub use transport::PeerTransport;
