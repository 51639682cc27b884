//! Error types for the peer transport

use bitchat_core::errors::TransportError;
use bitchat_core::BitchatError;
use thiserror::Error;

/// Errors specific to the local peer-to-peer transport
#[derive(Error, Debug)]
pub enum PeerTransportError {
    #[error("mDNS daemon error: {0}")]
    Mdns(String),

    #[error("failed to bind TCP listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("peer {peer_id} not discovered")]
    PeerNotDiscovered { peer_id: String },

    #[error("connection to {peer_id} timed out")]
    ConnectTimeout { peer_id: String },

    #[error("advertised discovery info for {peer_id} was malformed: {reason}")]
    MalformedAdvertisement { peer_id: String, reason: String },
}

impl From<PeerTransportError> for BitchatError {
    fn from(err: PeerTransportError) -> Self {
        match err {
            PeerTransportError::PeerNotDiscovered { peer_id } => {
                BitchatError::Transport(TransportError::PeerNotFound { peer_id })
            }
            PeerTransportError::ConnectTimeout { peer_id } => {
                BitchatError::connection_failed(peer_id, "connect timed out")
            }
            other => BitchatError::Transport(TransportError::InvalidConfiguration {
                reason: other.to_string(),
            }),
        }
    }
}
