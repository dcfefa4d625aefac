//! Delimiter-terminated message framing for serial byte streams.
//!
//! Devices emit each record followed by a fixed trailer (`EOM\n` by default).
//! This crate splits a byte stream back into those records:
//! - [`FrameDecoder`] splits an in-memory buffer, resuming across partial reads
//! - [`FrameReader`] drives a decoder from any blocking `Read`
//!
//! Oversized records are reported once and skipped up to the next trailer,
//! so a corrupted stream resynchronizes on its own.

pub mod codec;
pub mod error;
pub mod reader;

pub use codec::{
    encode_frame, Frame, FrameConfig, FrameDecoder, DEFAULT_DELIMITER, DEFAULT_MAX_FRAME_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
