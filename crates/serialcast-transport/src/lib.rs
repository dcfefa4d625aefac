//! Serial device and multicast transports.
//!
//! Provides the two byte-level endpoints of a bridge:
//! - A serial device opened for blocking reads ([`open_serial`])
//! - A best-effort UDP multicast publisher ([`MulticastSink`])
//!
//! This is the lowest layer of serialcast. Framing and buffering live in the
//! crates above it.

pub mod error;
pub mod multicast;
pub mod serial;

pub use error::{Result, TransportError};
pub use multicast::{parse_group, MulticastConfig, MulticastSink, DEFAULT_GROUP, DEFAULT_TTL};
pub use serial::{
    available_ports, default_device_path, open_serial, PortInfo, SerialConfig, SerialLink,
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT,
};
