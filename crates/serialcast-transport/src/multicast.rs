use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default multicast group and port for published frames.
pub const DEFAULT_GROUP: &str = "224.0.0.1:28650";

/// Default IPv4 multicast TTL (stay on the local segment).
pub const DEFAULT_TTL: u32 = 1;

const UDP_SCHEME: &str = "udp://";

/// Multicast publisher settings.
#[derive(Debug, Clone)]
pub struct MulticastConfig {
    /// Group endpoint, `ip:port` with an optional `udp://` prefix.
    pub group: String,
    /// IPv4 multicast TTL. Ignored for IPv6 groups.
    pub ttl: u32,
    /// Deliver our own datagrams to local group members.
    pub loopback: bool,
    /// Local IPv4 address to send from. Default: unspecified.
    pub interface: Option<Ipv4Addr>,
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            ttl: DEFAULT_TTL,
            loopback: true,
            interface: None,
        }
    }
}

/// Best-effort UDP multicast publisher.
///
/// Every `publish` is one datagram to the group. There is no retry and no
/// delivery confirmation.
#[derive(Debug)]
pub struct MulticastSink {
    socket: UdpSocket,
    group: SocketAddr,
}

impl MulticastSink {
    /// Bind a sending socket for the configured group.
    pub fn open(config: &MulticastConfig) -> Result<Self> {
        let group = parse_group(&config.group)?;
        let bind_err = |source: std::io::Error| TransportError::Bind {
            addr: config.group.clone(),
            source,
        };

        let socket = match group.ip() {
            IpAddr::V4(_) => {
                let local = config.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
                let socket = UdpSocket::bind((local, 0)).map_err(bind_err)?;
                socket.set_multicast_ttl_v4(config.ttl).map_err(bind_err)?;
                socket
                    .set_multicast_loop_v4(config.loopback)
                    .map_err(bind_err)?;
                socket
            }
            IpAddr::V6(_) => {
                let socket = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)).map_err(bind_err)?;
                socket
                    .set_multicast_loop_v6(config.loopback)
                    .map_err(bind_err)?;
                socket
            }
        };

        info!(%group, ttl = config.ttl, "multicast publisher ready");

        Ok(Self { socket, group })
    }

    /// Send one frame to the group.
    pub fn publish(&self, payload: &[u8]) -> Result<()> {
        self.socket
            .send_to(payload, self.group)
            .map_err(|source| TransportError::Send {
                addr: self.group.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Destination group.
    pub fn group(&self) -> SocketAddr {
        self.group
    }

    /// Local address of the sending socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }
}

impl Drop for MulticastSink {
    fn drop(&mut self) {
        debug!(group = %self.group, "closing multicast publisher");
    }
}

/// Parse a group endpoint and check that it is a multicast address.
pub fn parse_group(input: &str) -> Result<SocketAddr> {
    let trimmed = input.trim();
    let raw = trimmed.strip_prefix(UDP_SCHEME).unwrap_or(trimmed);

    let addr: SocketAddr = raw.parse().map_err(|_| TransportError::InvalidAddress {
        addr: input.to_string(),
        reason: "expected ip:port".to_string(),
    })?;

    if !addr.ip().is_multicast() {
        return Err(TransportError::InvalidAddress {
            addr: input.to_string(),
            reason: format!("{} is not a multicast address", addr.ip()),
        });
    }
    if addr.port() == 0 {
        return Err(TransportError::InvalidAddress {
            addr: input.to_string(),
            reason: "port must be non-zero".to_string(),
        });
    }

    Ok(addr)
}
