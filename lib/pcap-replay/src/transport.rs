//! UDP transport (C10): sends a packet's payload as one or more datagrams,
//! selecting broadcast/multicast/unicast socket options at construction.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use pcap_format::{PcapError, Result};
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::trace;

/// Largest payload sent as a single datagram; larger payloads are split
/// into consecutive chunks of this size (spec §4.10).
pub const MAX_DATAGRAM: usize = 60_000;

/// Pause between consecutive fragments of one oversized payload, to reduce
/// burst loss on lossy links.
const INTER_CHUNK_PAUSE: Duration = Duration::from_millis(1);

/// How a [`UdpTransport`] addresses its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Destination is a broadcast address; the socket's broadcast flag is
    /// enabled.
    Broadcast,
    /// Destination is a multicast group; the socket joins it. For IPv4 the
    /// TTL is set to 64; for IPv6 the hop limit is left at the platform
    /// default (tokio exposes no `IPV6_MULTICAST_HOPS` setter).
    Multicast,
    /// Any other routable destination.
    Unicast,
}

impl TransportMode {
    /// Infers a mode from the destination address (used when the CLI
    /// doesn't specify `--mode` explicitly).
    pub fn infer(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => {
                if v4 == Ipv4Addr::BROADCAST || v4.octets()[3] == 255 {
                    TransportMode::Broadcast
                } else if v4.is_multicast() {
                    TransportMode::Multicast
                } else {
                    TransportMode::Unicast
                }
            }
            IpAddr::V6(v6) => {
                if v6.is_multicast() {
                    TransportMode::Multicast
                } else {
                    TransportMode::Unicast
                }
            }
        }
    }
}

/// A UDP destination, ready to emit packet payloads as datagrams.
pub struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
    mode: TransportMode,
}

impl UdpTransport {
    /// Binds a socket and configures it for `mode`, targeting
    /// `destination`.
    pub async fn bind(destination: SocketAddr, mode: TransportMode) -> Result<Self> {
        let bind_addr: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind_addr).await.map_err(PcapError::from)?;

        match mode {
            TransportMode::Broadcast => {
                socket.set_broadcast(true).map_err(PcapError::from)?;
            }
            TransportMode::Multicast => match (destination, bind_addr.ip()) {
                (SocketAddr::V4(dest), IpAddr::V4(local)) => {
                    socket
                        .join_multicast_v4(*dest.ip(), local)
                        .map_err(PcapError::from)?;
                    socket.set_multicast_ttl_v4(64).map_err(PcapError::from)?;
                }
                (SocketAddr::V6(dest), IpAddr::V6(_)) => {
                    // Interface `0` lets the OS pick the default
                    // multicast-capable interface, matching the "any
                    // interface" behavior of the IPv4 join above. Tokio's
                    // `UdpSocket` has no IPv6 analogue of
                    // `set_multicast_ttl_v4` (there is no
                    // `IPV6_MULTICAST_HOPS` setter), so the hop limit is
                    // left at the platform default rather than silently
                    // not joining the group at all.
                    socket
                        .join_multicast_v6(dest.ip(), 0)
                        .map_err(PcapError::from)?;
                }
                _ => {}
            },
            TransportMode::Unicast => {}
        }

        socket.connect(destination).await.map_err(PcapError::from)?;
        Ok(Self {
            socket,
            destination,
            mode,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Sends `payload`, fragmenting into [`MAX_DATAGRAM`]-byte chunks if
    /// necessary. Returns the total number of payload bytes sent.
    pub async fn send(&self, payload: &[u8]) -> Result<usize> {
        if payload.len() <= MAX_DATAGRAM {
            self.socket.send(payload).await.map_err(PcapError::from)?;
            return Ok(payload.len());
        }

        let mut sent = 0;
        let chunks: Vec<&[u8]> = payload.chunks(MAX_DATAGRAM).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            self.socket.send(chunk).await.map_err(PcapError::from)?;
            sent += chunk.len();
            trace!(chunk = i, len = chunk.len(), "sent fragment");
            if i + 1 < chunks.len() {
                sleep(INTER_CHUNK_PAUSE).await;
            }
        }
        Ok(sent)
    }
}
