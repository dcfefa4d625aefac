use serialcast_frame::Frame;

/// End-of-life signals from a [`BoundedChannel`](crate::BoundedChannel).
///
/// Neither is a fault; both tell a loop to unwind.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel no longer accepts frames. The rejected frame is returned.
    #[error("channel closed ({} byte frame rejected)", .0.len())]
    Closed(Frame),

    /// Cancellation is active and every queued frame has been taken.
    #[error("channel drained")]
    Drained,
}

/// Errors that can occur while starting or joining a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Channel capacity must be at least one frame.
    #[error("channel capacity must be greater than zero")]
    InvalidCapacity,

    /// A loop thread could not be started.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        source: std::io::Error,
    },

    /// A loop thread panicked. The pipeline was cancelled and drained.
    #[error("{0} loop panicked")]
    LoopPanicked(&'static str),

    /// Transport setup failed.
    #[error("transport error: {0}")]
    Transport(#[from] serialcast_transport::TransportError),

    /// Frame source setup failed.
    #[error("frame error: {0}")]
    Frame(#[from] serialcast_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
