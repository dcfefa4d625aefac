use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{Frame, FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Blocking record reader over a serial link (or any `Read`).
///
/// Bytes are accumulated until the decoder finds a full record, so callers
/// only ever see whole frames. Errors leave the stream open and keep any
/// partial record buffered; a later call resumes where the last one stopped.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: FrameDecoder,
}

impl<T: Read> FrameReader<T> {
    /// Wrap `inner` using the default `EOM\n` trailer.
    pub fn new(inner: T) -> Self {
        Self::from_decoder(inner, FrameDecoder::default())
    }

    /// Wrap `inner` with a custom trailer or size limit.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        Ok(Self::from_decoder(inner, FrameDecoder::new(config)?))
    }

    fn from_decoder(inner: T, decoder: FrameDecoder) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder,
        }
    }

    /// Block until the next record is complete and return its payload.
    ///
    /// EOF yields `ConnectionClosed`. A timeout or other I/O failure yields
    /// `FrameError::Io`, and bytes received so far stay buffered.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match self.decoder.decode(&mut self.buf)? {
                Some(frame) => return Ok(frame),
                None => self.fill()?,
            }
        }
    }

    /// Pull one chunk from the stream into the buffer.
    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Bytes held back waiting for a trailer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// The wrapped stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Unwrap the stream, discarding buffered bytes.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Active trailer and size limit.
    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("buffered", &self.buf.len())
            .field("config", self.decoder.config())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor};

    use bytes::Bytes;

    use super::*;
    use crate::codec::{encode_frame, DEFAULT_DELIMITER};

    fn wire(payloads: &[&str]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload.as_bytes(), DEFAULT_DELIMITER, &mut buf);
        }
        buf.to_vec()
    }

    /// What a serial port hands back on successive `read` calls.
    enum Step {
        Bytes(Vec<u8>),
        Fail(ErrorKind),
    }

    /// Replays steps in order, then reports EOF.
    struct Scripted(VecDeque<Step>);

    impl Scripted {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self(steps.into_iter().collect())
        }

        fn one_byte_at_a_time(bytes: &[u8]) -> Self {
            Self::new(bytes.iter().map(|b| Step::Bytes(vec![*b])))
        }
    }

    impl Read for Scripted {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Step::Fail(kind)) => Err(io::Error::from(kind)),
                Some(Step::Bytes(bytes)) => {
                    let n = bytes.len().min(out.len());
                    out[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.push_front(Step::Bytes(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn yields_records_in_order() {
        let mut reader = FrameReader::new(Cursor::new(wire(&["alpha", "beta", "gamma"])));

        for expected in ["alpha", "beta", "gamma"] {
            let frame = reader.read_frame().unwrap();
            assert_eq!(frame.as_ref(), expected.as_bytes());
        }
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn record_spanning_several_chunks() {
        let payload = vec![0x5A; 2 * READ_CHUNK_SIZE + 301];
        let mut bytes = BytesMut::new();
        encode_frame(&payload, DEFAULT_DELIMITER, &mut bytes);

        let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));
        assert_eq!(reader.read_frame().unwrap().len(), payload.len());
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn single_byte_reads_assemble_record() {
        let mut reader = FrameReader::new(Scripted::one_byte_at_a_time(&wire(&["drip"])));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"drip");
    }

    #[test]
    fn eof_mid_record_keeps_fragment() {
        let mut reader = FrameReader::new(Cursor::new(b"half-a-recordEO".to_vec()));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
        assert_eq!(reader.buffered(), b"half-a-recordEO".len());
    }

    #[test]
    fn oversized_record_then_recovery() {
        let cfg = FrameConfig {
            max_frame_size: 8,
            ..FrameConfig::default()
        };
        let stream = Cursor::new(wire(&["this-record-is-too-long", "fits"]));
        let mut reader = FrameReader::with_config(stream, cfg).unwrap();

        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::FrameTooLarge { max: 8, .. }
        ));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"fits");
    }

    #[test]
    fn crlf_trailer() {
        let cfg = FrameConfig {
            delimiter: Bytes::from_static(b"\r\n"),
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config(Cursor::new(b"x=1\r\ny=2\r\n".to_vec()), cfg).unwrap();

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"x=1");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"y=2");
        assert_eq!(reader.config().delimiter.as_ref(), b"\r\n");
    }

    #[test]
    fn empty_trailer_is_rejected() {
        let cfg = FrameConfig {
            delimiter: Bytes::new(),
            ..FrameConfig::default()
        };
        let err = FrameReader::with_config(Cursor::new(Vec::new()), cfg).unwrap_err();
        assert!(matches!(err, FrameError::EmptyDelimiter));
    }

    #[test]
    fn timeout_preserves_partial_record() {
        let mut reader = FrameReader::new(Scripted::new([
            Step::Bytes(b"tele".to_vec()),
            Step::Fail(ErrorKind::TimedOut),
            Step::Bytes(b"metryEOM\n".to_vec()),
        ]));

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(reader.buffered(), 4);

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"telemetry");
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut reader = FrameReader::new(Scripted::new([
            Step::Fail(ErrorKind::Interrupted),
            Step::Fail(ErrorKind::Interrupted),
            Step::Bytes(wire(&["ok"])),
        ]));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn device_errors_surface_as_io() {
        let mut reader = FrameReader::new(Scripted::new([Step::Fail(ErrorKind::BrokenPipe)]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(!err.is_timeout());
    }

    #[test]
    fn into_inner_returns_stream() {
        let reader = FrameReader::new(Cursor::new(b"abc".to_vec()));
        assert_eq!(reader.get_ref().get_ref().as_slice(), b"abc");
        assert_eq!(reader.into_inner().position(), 0);
    }
}
