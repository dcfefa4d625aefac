//! Republish framed serial-device messages over UDP multicast.
//!
//! serialcast reads delimiter-terminated records from a serial device,
//! buffers them in a bounded queue, and sends each one as a multicast
//! datagram. Reads and publishes run on separate threads so a slow network
//! never stalls the device beyond the queue's capacity.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial device and multicast socket endpoints
//! - [`frame`]: Delimiter-terminated record framing
//! - [`pipeline`]: Bounded producer/consumer pipeline and shutdown

/// Re-export transport types.
pub mod transport {
    pub use serialcast_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialcast_frame::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use serialcast_pipeline::*;
}
