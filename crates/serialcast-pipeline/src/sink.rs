use serialcast_frame::Frame;
use serialcast_transport::{MulticastSink, TransportError};

/// Best-effort frame publisher, driven by the consumer loop.
pub trait FrameSink: Send {
    /// Hand one frame to the transport. No retry, no acknowledgment.
    fn publish(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Release the transport. Called once, after the last publish.
    fn close(&mut self) {}
}

impl FrameSink for MulticastSink {
    fn publish(&mut self, frame: &Frame) -> Result<(), TransportError> {
        MulticastSink::publish(self, frame.as_ref())
    }
}
