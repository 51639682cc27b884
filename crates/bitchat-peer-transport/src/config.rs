//! Configuration for the local peer-to-peer transport

use std::time::Duration;

/// mDNS service type peers advertise themselves under (§4.8).
pub const SERVICE_TYPE: &str = "_bitchat._tcp.local.";

/// Configuration for peer transport discovery and framing
#[derive(Debug, Clone)]
pub struct PeerTransportConfig {
    /// TCP port this node listens for peer connections on
    pub listen_port: u16,
    /// How long an mDNS browse result is trusted before being re-verified
    pub discovery_refresh: Duration,
    /// Maximum payload bytes per framed message
    pub max_packet_size: usize,
    /// Timeout for establishing an outbound connection to a discovered peer
    pub connect_timeout: Duration,
}

impl Default for PeerTransportConfig {
    fn default() -> Self {
        Self {
            listen_port: 0, // let the OS pick a free port; advertised via mDNS
            discovery_refresh: Duration::from_secs(30),
            max_packet_size: 1_048_576, // 1MB, far above BLE's MTU
            connect_timeout: Duration::from_secs(5),
        }
    }
}
