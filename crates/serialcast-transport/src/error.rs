use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial device could not be opened.
    #[error("serial device {path} unavailable: {source}")]
    DeviceUnavailable {
        path: PathBuf,
        source: serialport::Error,
    },

    /// Failed to bind or configure the multicast socket.
    #[error("failed to bind multicast socket for {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The multicast endpoint string is not usable.
    #[error("invalid multicast address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// A datagram could not be handed to the network stack.
    #[error("failed to send to {addr}: {source}")]
    Send {
        addr: String,
        source: std::io::Error,
    },

    /// Serial port enumeration failed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
