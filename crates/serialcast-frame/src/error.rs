use std::io::ErrorKind;

/// Errors that can occur while splitting a byte stream into frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A record exceeded the configured maximum size and was dropped.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The configured delimiter is empty.
    #[error("frame delimiter must not be empty")]
    EmptyDelimiter,

    /// An I/O error occurred while reading the stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when a read gave up waiting for bytes rather than failing.
    ///
    /// Buffered partial data survives a timeout, so the next read resumes the
    /// same record.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
