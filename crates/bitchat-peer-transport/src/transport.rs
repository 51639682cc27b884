//! The local peer-to-peer Wi-Fi transport (§4.8)
//!
//! Peers are discovered over mDNS ([`crate::discovery`]) and exchange
//! length-prefixed [`BitchatPacket`]s over plain TCP. Each connection tracks
//! a monotonic receive sequence number per peer; a regression is treated as
//! a replay and the packet is dropped rather than delivered.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use smallvec::SmallVec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use bitchat_core::errors::{BitchatError, ReplayError};
use bitchat_core::protocol::wire::WireFormat;
use bitchat_core::transport::{
    LatencyClass, ReliabilityClass, Transport, TransportCapabilities, TransportKind,
};
use bitchat_core::{BitchatPacket, PeerId, Result};

use crate::config::PeerTransportConfig;
use crate::discovery::{DiscoveredPeer, Discovery};
use crate::error::PeerTransportError;

/// 4-byte big-endian length prefix ahead of each encoded packet on the wire.
const LENGTH_PREFIX_SIZE: usize = 4;

struct PeerConnection {
    addr: SocketAddr,
    write_half: Mutex<tokio::net::tcp::OwnedWriteHalf>,
    last_seq_seen: Mutex<u64>,
}

/// Local peer-to-peer Wi-Fi transport: mDNS discovery plus framed TCP.
pub struct PeerTransport {
    local_peer_id: PeerId,
    local_public_key: [u8; 32],
    config: PeerTransportConfig,
    discovery: Discovery,
    connections: Arc<Mutex<HashMap<PeerId, Arc<PeerConnection>>>>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<(PeerId, BitchatPacket)>>,
    inbound_tx: mpsc::UnboundedSender<(PeerId, BitchatPacket)>,
    discovered: Arc<Mutex<HashMap<PeerId, DiscoveredPeer>>>,
    next_send_seq: Mutex<u64>,
    listener_port: Mutex<Option<u16>>,
    active: Mutex<bool>,
}

impl PeerTransport {
    pub fn new(
        local_peer_id: PeerId,
        local_public_key: [u8; 32],
        config: PeerTransportConfig,
    ) -> std::result::Result<Self, PeerTransportError> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Ok(Self {
            local_peer_id,
            local_public_key,
            config,
            discovery: Discovery::new()?,
            connections: Arc::new(Mutex::new(HashMap::new())),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            discovered: Arc::new(Mutex::new(HashMap::new())),
            next_send_seq: Mutex::new(0),
            listener_port: Mutex::new(None),
            active: Mutex::new(false),
        })
    }

    async fn spawn_listener(&self) -> std::result::Result<u16, PeerTransportError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.listen_port))
            .await
            .map_err(PeerTransportError::Bind)?;
        let port = listener.local_addr().map_err(PeerTransportError::Bind)?.port();

        let connections = self.connections.clone();
        let inbound_tx = self.inbound_tx.clone();
        let max_packet_size = self.config.max_packet_size;

        tokio::spawn(async move {
            loop {
                let (stream, addr) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("peer transport accept failed: {e}");
                        continue;
                    }
                };
                let connections = connections.clone();
                let inbound_tx = inbound_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        handle_inbound_stream(stream, addr, connections, inbound_tx, max_packet_size)
                            .await
                    {
                        debug!("peer connection from {addr} ended: {e}");
                    }
                });
            }
        });

        Ok(port)
    }

    async fn spawn_browse(&self) -> std::result::Result<(), PeerTransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.discovery.browse(tx)?;
        let discovered = self.discovered.clone();
        tokio::spawn(async move {
            while let Some(peer) = rx.recv().await {
                discovered.lock().await.insert(peer.peer_id, peer);
            }
        });
        Ok(())
    }

    async fn ensure_connection(&self, peer_id: PeerId) -> Result<Arc<PeerConnection>> {
        if let Some(conn) = self.connections.lock().await.get(&peer_id) {
            return Ok(conn.clone());
        }

        let addr = self
            .discovered
            .lock()
            .await
            .get(&peer_id)
            .map(|p| p.addr)
            .ok_or_else(|| {
                PeerTransportError::PeerNotDiscovered {
                    peer_id: hex::encode(peer_id.as_bytes()),
                }
            })?;

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| PeerTransportError::ConnectTimeout {
                peer_id: hex::encode(peer_id.as_bytes()),
            })?
            .map_err(PeerTransportError::Bind)?;

        let (read_half, write_half) = stream.into_split();
        let conn = Arc::new(PeerConnection {
            addr,
            write_half: Mutex::new(write_half),
            last_seq_seen: Mutex::new(0),
        });

        self.connections.lock().await.insert(peer_id, conn.clone());

        let connections = self.connections.clone();
        let inbound_tx = self.inbound_tx.clone();
        let max_packet_size = self.config.max_packet_size;
        tokio::spawn(async move {
            if let Err(e) = read_loop(peer_id, read_half, connections, inbound_tx, max_packet_size).await {
                debug!("peer read loop for {peer_id:?} ended: {e}");
            }
        });

        Ok(conn)
    }

    async fn send_frame(&self, conn: &Arc<PeerConnection>, packet: &BitchatPacket) -> Result<()> {
        let encoded = WireFormat::encode(packet)?;
        if encoded.len() > self.config.max_packet_size {
            return Err(BitchatError::invalid_packet("packet exceeds max_packet_size"));
        }

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + encoded.len());
        frame.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        frame.extend_from_slice(&encoded);

        let mut write_half = conn.write_half.lock().await;
        write_half
            .write_all(&frame)
            .await
            .map_err(|e| PeerTransportError::Bind(e).into())
    }
}

async fn read_loop(
    peer_id: PeerId,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    connections: Arc<Mutex<HashMap<PeerId, Arc<PeerConnection>>>>,
    inbound_tx: mpsc::UnboundedSender<(PeerId, BitchatPacket)>,
    max_packet_size: usize,
) -> Result<()> {
    loop {
        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        if read_half.read_exact(&mut len_buf).await.is_err() {
            break;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > max_packet_size {
            warn!("dropping oversized frame from {peer_id:?} ({len} bytes)");
            break;
        }

        let mut body = vec![0u8; len];
        if read_half.read_exact(&mut body).await.is_err() {
            break;
        }

        let packet = match WireFormat::decode(&body) {
            Ok(Some(packet)) => packet,
            Ok(None) => continue,
            Err(e) => {
                warn!("dropping malformed frame from {peer_id:?}: {e}");
                continue;
            }
        };

        if let Some(conn) = connections.lock().await.get(&peer_id) {
            let seq = packet.header.timestamp.as_millis();
            let mut last_seen = conn.last_seq_seen.lock().await;
            if seq <= *last_seen && *last_seen != 0 {
                warn!(
                    "replay detected from {peer_id:?}: {:?}",
                    ReplayError::SequenceRegression { peer_id: hex::encode(peer_id.as_bytes()) }
                );
                continue;
            }
            *last_seen = seq;
        }

        if inbound_tx.send((peer_id, packet)).is_err() {
            break;
        }
    }
    Ok(())
}

async fn handle_inbound_stream(
    stream: TcpStream,
    addr: SocketAddr,
    connections: Arc<Mutex<HashMap<PeerId, Arc<PeerConnection>>>>,
    inbound_tx: mpsc::UnboundedSender<(PeerId, BitchatPacket)>,
    max_packet_size: usize,
) -> Result<()> {
    let (mut read_half, write_half) = stream.into_split();

    // First frame on an inbound connection identifies the sender; everything
    // after is routed by that peer id.
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    read_half
        .read_exact(&mut len_buf)
        .await
        .map_err(PeerTransportError::Bind)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_packet_size {
        return Err(BitchatError::invalid_packet("first frame exceeds max_packet_size"));
    }
    let mut body = vec![0u8; len];
    read_half.read_exact(&mut body).await.map_err(PeerTransportError::Bind)?;
    let packet = WireFormat::decode(&body)?.ok_or_else(|| BitchatError::invalid_packet("unrecognized first frame"))?;
    let peer_id = packet.sender_id;

    let conn = Arc::new(PeerConnection {
        addr,
        write_half: Mutex::new(write_half),
        last_seq_seen: Mutex::new(packet.header.timestamp.as_millis()),
    });
    connections.lock().await.insert(peer_id, conn.clone());
    let _ = inbound_tx.send((peer_id, packet));

    read_loop(peer_id, read_half, connections, inbound_tx, max_packet_size).await
}

#[async_trait]
impl Transport for PeerTransport {
    async fn send_to(&mut self, peer_id: PeerId, packet: BitchatPacket) -> Result<()> {
        let conn = self.ensure_connection(peer_id).await?;
        self.send_frame(&conn, &packet).await
    }

    async fn broadcast(&mut self, packet: BitchatPacket) -> Result<()> {
        let peer_ids: Vec<PeerId> = self.discovered.lock().await.keys().copied().collect();
        for peer_id in peer_ids {
            if let Ok(conn) = self.ensure_connection(peer_id).await {
                if let Err(e) = self.send_frame(&conn, &packet).await {
                    warn!("broadcast to {peer_id:?} failed: {e}");
                }
            }
        }
        Ok(())
    }

    async fn receive(&mut self) -> Result<(PeerId, BitchatPacket)> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| BitchatError::connection_failed("peer-transport", "inbound channel closed"))
    }

    fn discovered_peers(&self) -> SmallVec<[PeerId; 8]> {
        self.discovered
            .try_lock()
            .map(|d| d.keys().copied().collect())
            .unwrap_or_default()
    }

    async fn start(&mut self) -> Result<()> {
        let port = self
            .spawn_listener()
            .await
            .map_err(Into::<BitchatError>::into)?;
        *self.listener_port.lock().await = Some(port);

        let host_ip: std::net::IpAddr = local_ipv4().into();
        self.discovery
            .advertise(self.local_peer_id, self.local_public_key, host_ip, port)
            .map_err(Into::<BitchatError>::into)?;
        self.spawn_browse().await.map_err(Into::<BitchatError>::into)?;

        *self.active.lock().await = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.discovery.stop_advertising().map_err(Into::<BitchatError>::into)?;
        self.connections.lock().await.clear();
        *self.active.lock().await = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.try_lock().map(|a| *a).unwrap_or(false)
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            kind: TransportKind::Peer,
            max_packet_size: self.config.max_packet_size,
            supports_discovery: true,
            supports_broadcast: true,
            latency_class: LatencyClass::Low,
            reliability_class: ReliabilityClass::High,
        }
    }
}

fn local_ipv4() -> std::net::Ipv4Addr {
    std::net::Ipv4Addr::UNSPECIFIED
}
