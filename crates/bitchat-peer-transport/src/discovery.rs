//! mDNS-based discovery for the local peer-to-peer transport (§4.8)
//!
//! Each node advertises itself under [`SERVICE_TYPE`] with its stable peer
//! ID and base64-encoded static public key in the TXT record, and browses
//! for the same service to learn about other nodes on the LAN.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use base64::Engine;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use bitchat_core::PeerId;

use crate::config::SERVICE_TYPE;
use crate::error::PeerTransportError;

const TXT_PEER_ID: &str = "peer_id";
const TXT_PUBLIC_KEY: &str = "pubkey";

/// Everything learned about a peer from its mDNS advertisement.
#[derive(Debug, Clone)]
pub struct DiscoveredPeer {
    pub peer_id: PeerId,
    pub public_key: [u8; 32],
    pub addr: SocketAddr,
}

fn parse_txt(info: &ServiceInfo) -> Result<(PeerId, [u8; 32]), PeerTransportError> {
    let props = info.get_properties();

    let peer_id_hex = props
        .get(TXT_PEER_ID)
        .map(|p| p.val_str())
        .ok_or_else(|| PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "missing peer_id TXT entry".into(),
        })?;

    let peer_id_bytes = hex::decode(peer_id_hex).map_err(|_| {
        PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "peer_id is not valid hex".into(),
        }
    })?;
    if peer_id_bytes.len() != 8 {
        return Err(PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "peer_id must be 8 bytes".into(),
        });
    }
    let mut peer_id_arr = [0u8; 8];
    peer_id_arr.copy_from_slice(&peer_id_bytes);

    let pubkey_b64 = props.get(TXT_PUBLIC_KEY).map(|p| p.val_str()).ok_or_else(|| {
        PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "missing pubkey TXT entry".into(),
        }
    })?;

    let pubkey_bytes = base64::engine::general_purpose::STANDARD
        .decode(pubkey_b64)
        .map_err(|_| PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "pubkey is not valid base64".into(),
        })?;
    if pubkey_bytes.len() != 32 {
        return Err(PeerTransportError::MalformedAdvertisement {
            peer_id: info.get_fullname().to_string(),
            reason: "pubkey must be 32 bytes".into(),
        });
    }
    let mut pubkey_arr = [0u8; 32];
    pubkey_arr.copy_from_slice(&pubkey_bytes);

    Ok((PeerId::new(peer_id_arr), pubkey_arr))
}

/// Advertise this node and browse for others over mDNS.
pub struct Discovery {
    daemon: ServiceDaemon,
    instance_name: String,
}

impl Discovery {
    pub fn new() -> Result<Self, PeerTransportError> {
        let daemon = ServiceDaemon::new().map_err(|e| PeerTransportError::Mdns(e.to_string()))?;
        Ok(Self {
            daemon,
            instance_name: String::new(),
        })
    }

    /// Advertise this node's identity and listening address.
    pub fn advertise(
        &mut self,
        local_peer_id: PeerId,
        public_key: [u8; 32],
        host_ip: IpAddr,
        port: u16,
    ) -> Result<(), PeerTransportError> {
        let instance_name = hex::encode(local_peer_id.as_bytes());
        let host_name = format!("{instance_name}.local.");

        let mut properties = HashMap::new();
        properties.insert(TXT_PEER_ID.to_string(), instance_name.clone());
        properties.insert(
            TXT_PUBLIC_KEY.to_string(),
            base64::engine::general_purpose::STANDARD.encode(public_key),
        );

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            &instance_name,
            &host_name,
            host_ip,
            port,
            Some(properties),
        )
        .map_err(|e| PeerTransportError::Mdns(e.to_string()))?;

        self.daemon
            .register(service_info)
            .map_err(|e| PeerTransportError::Mdns(e.to_string()))?;

        self.instance_name = instance_name;
        Ok(())
    }

    pub fn stop_advertising(&mut self) -> Result<(), PeerTransportError> {
        if self.instance_name.is_empty() {
            return Ok(());
        }
        let fullname = format!("{}.{}", self.instance_name, SERVICE_TYPE);
        self.daemon
            .unregister(&fullname)
            .map_err(|e| PeerTransportError::Mdns(e.to_string()))?;
        Ok(())
    }

    /// Browse for peers and forward resolved ones on `tx` until the
    /// returned task is dropped or aborted.
    pub fn browse(&self, tx: mpsc::UnboundedSender<DiscoveredPeer>) -> Result<(), PeerTransportError> {
        let receiver = self
            .daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| PeerTransportError::Mdns(e.to_string()))?;

        tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                if let ServiceEvent::ServiceResolved(info) = event {
                    match parse_txt(&info) {
                        Ok((peer_id, public_key)) => {
                            let Some(addr) = info
                                .get_addresses()
                                .iter()
                                .next()
                                .map(|ip| SocketAddr::new(*ip, info.get_port()))
                            else {
                                continue;
                            };
                            if tx
                                .send(DiscoveredPeer {
                                    peer_id,
                                    public_key,
                                    addr,
                                })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => warn!("ignoring malformed peer advertisement: {e}"),
                    }
                }
            }
            debug!("mDNS browse task ended");
        });

        Ok(())
    }
}
