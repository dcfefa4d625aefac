use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Record trailer emitted by the device firmware: "EOM\n".
pub const DEFAULT_DELIMITER: &[u8] = b"EOM\n";

/// Default maximum payload size: 64 KiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// One delimited message. The payload is opaque and excludes the delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for a zero-length record (delimiter only).
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.payload.as_ref()
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Record trailer. Must not be empty. Default: `EOM\n`.
    pub delimiter: Bytes,
    /// Maximum payload size in bytes. Default: 64 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            delimiter: Bytes::from_static(DEFAULT_DELIMITER),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Append `payload` followed by `delimiter` to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬──────────────────┐
/// │ Payload (any length) │ Delimiter        │
/// │                      │ "EOM\n" (4B)     │
/// └──────────────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], delimiter: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + delimiter.len());
    dst.put_slice(payload);
    dst.put_slice(delimiter);
}

/// Incremental splitter for delimiter-terminated records.
///
/// Keeps just enough state to resume scanning where the previous call
/// stopped and to skip the remainder of an oversized record.
#[derive(Debug)]
pub struct FrameDecoder {
    config: FrameConfig,
    /// Bytes of `src` already known not to start a delimiter.
    scanned: usize,
    /// Dropping bytes until the next delimiter after an oversized record.
    discarding: bool,
}

impl FrameDecoder {
    /// Create a decoder. Fails if the delimiter is empty.
    pub fn new(config: FrameConfig) -> Result<Self> {
        if config.delimiter.is_empty() {
            return Err(FrameError::EmptyDelimiter);
        }
        Ok(Self {
            config,
            scanned: 0,
            discarding: false,
        })
    }

    /// Decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Split the next complete record off the front of `src`.
    ///
    /// Returns `Ok(None)` if `src` doesn't contain a complete record yet.
    /// On success, consumes the payload and its delimiter. An oversized record
    /// yields `FrameTooLarge` once; its bytes are dropped up to and including
    /// the next delimiter, after which decoding resumes normally.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            let delim_len = self.config.delimiter.len();
            let start = self.scanned.min(src.len());
            let found = find(&src[start..], &self.config.delimiter).map(|offset| start + offset);

            match found {
                Some(pos) if self.discarding => {
                    src.advance(pos + delim_len);
                    self.scanned = 0;
                    self.discarding = false;
                }
                Some(pos) => {
                    self.scanned = 0;
                    if pos > self.config.max_frame_size {
                        src.advance(pos + delim_len);
                        return Err(FrameError::FrameTooLarge {
                            size: pos,
                            max: self.config.max_frame_size,
                        });
                    }
                    let payload = src.split_to(pos).freeze();
                    src.advance(delim_len);
                    return Ok(Some(Frame { payload }));
                }
                None => {
                    // A delimiter may straddle the end of the buffer.
                    let keep = delim_len - 1;
                    if self.discarding {
                        let drop = src.len().saturating_sub(keep);
                        src.advance(drop);
                        self.scanned = 0;
                        return Ok(None);
                    }
                    if src.len() > self.config.max_frame_size + keep {
                        let size = src.len();
                        src.advance(size - keep);
                        self.scanned = 0;
                        self.discarding = true;
                        return Err(FrameError::FrameTooLarge {
                            size,
                            max: self.config.max_frame_size,
                        });
                    }
                    self.scanned = src.len().saturating_sub(keep);
                    return Ok(None);
                }
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            config: FrameConfig::default(),
            scanned: 0,
            discarding: false,
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
