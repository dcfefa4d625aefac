use std::io::Read;

use serialcast_frame::{Frame, FrameError, FrameReader};
use tracing::debug;

/// Blocking supplier of frames, driven by the producer loop.
pub trait FrameSource: Send {
    /// Block until the next complete frame is available.
    ///
    /// Errors are reported, never acted on: the source stays open and the
    /// caller decides whether to retry.
    fn read_frame(&mut self) -> Result<Frame, FrameError>;

    /// Release the underlying device. Called once, after the last read.
    fn close(&mut self) {}
}

impl<T: Read + Send> FrameSource for FrameReader<T> {
    fn read_frame(&mut self) -> Result<Frame, FrameError> {
        FrameReader::read_frame(self)
    }

    fn close(&mut self) {
        let buffered = self.buffered();
        if buffered > 0 {
            debug!(buffered, "dropping unterminated record on close");
        }
    }
}
