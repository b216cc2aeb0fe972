use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{FrameSource, RawFrame};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 256;

/// Longest line kept in the buffer before it is discarded as garbage.
pub const MAX_LINE_LEN: usize = 4096;

/// Serial device settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Character device path.
    pub path: PathBuf,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Longest time a single read blocks before reporting "no frame yet".
    pub poll_timeout: Duration,
    /// Discard the first line after every open (device banner).
    pub skip_banner: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyACM3"),
            baud_rate: 115_200,
            poll_timeout: Duration::from_millis(250),
            skip_banner: true,
        }
    }
}

/// Reads newline-terminated records from any `Read` stream.
///
/// Trailing whitespace (including `\r`) is stripped from each record. Read timeouts
/// keep the partial line buffered and surface as `Ok(None)`.
pub struct LineSource<R> {
    inner: R,
    buf: BytesMut,
    skip_lines: usize,
    discarding: bool,
}

/// A serial device read line by line.
pub type SerialSource = LineSource<Box<dyn serialport::SerialPort>>;

impl<R: Read> LineSource<R> {
    /// Wrap a stream; every line is returned.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            skip_lines: 0,
            discarding: false,
        }
    }

    /// Discard the next `lines` complete lines before returning any.
    pub fn skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_buffered_line(&mut self) -> Option<Bytes> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.skip_lines > 0 {
                self.skip_lines -= 1;
                debug!(len = line.len(), "skipping banner line");
                continue;
            }
            return Some(Bytes::copy_from_slice(line.trim_ascii_end()));
        }
        None
    }
}

impl SerialSource {
    /// Open a serial device.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.path.to_string_lossy(), config.baud_rate)
            .timeout(config.poll_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                path: config.path.clone(),
                source: std::io::Error::from(e),
            })?;

        info!(path = ?config.path, baud = config.baud_rate, "opened serial device");

        let source = LineSource::new(port);
        Ok(if config.skip_banner {
            source.skip_lines(1)
        } else {
            source
        })
    }
}

impl<R: Read> FrameSource for LineSource<R> {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        loop {
            if let Some(line) = self.next_buffered_line() {
                return Ok(Some(RawFrame::new(line)));
            }

            if self.buf.len() > MAX_LINE_LEN {
                warn!(len = self.buf.len(), "discarding over-long line");
                self.buf.clear();
                self.discarding = true;
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                // An unterminated final line is still a line.
                if !self.buf.is_empty() && !self.discarding && self.skip_lines == 0 {
                    let rest = self.buf.split();
                    return Ok(Some(RawFrame::new(Bytes::copy_from_slice(
                        rest.trim_ascii_end(),
                    ))));
                }
                return Err(TransportError::Closed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn transport_name(&self) -> &'static str {
        "serial-line"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_lines_and_strips_trailing_whitespace() {
        let mut source = LineSource::new(Cursor::new(b"first\r\nsecond  \n".to_vec()));

        let first = source.read_frame().unwrap().unwrap();
        let second = source.read_frame().unwrap().unwrap();

        assert_eq!(first.as_bytes(), b"first");
        assert_eq!(second.as_bytes(), b"second");
    }

    #[test]
    fn end_of_stream_is_closed() {
        let mut source = LineSource::new(Cursor::new(b"only\n".to_vec()));
        source.read_frame().unwrap();
        assert!(matches!(source.read_frame(), Err(TransportError::Closed)));
    }

    #[test]
    fn unterminated_last_line_is_returned_before_close() {
        let mut source = LineSource::new(Cursor::new(b"one\ntwo \r".to_vec()));
        assert_eq!(source.read_frame().unwrap().unwrap().as_bytes(), b"one");
        assert_eq!(source.read_frame().unwrap().unwrap().as_bytes(), b"two");
        assert!(matches!(source.read_frame(), Err(TransportError::Closed)));
    }

    #[test]
    fn skips_banner_line() {
        let mut source =
            LineSource::new(Cursor::new(b"IMU v1.2 ready\nDATA\n".to_vec())).skip_lines(1);
        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!(frame.as_bytes(), b"DATA");
    }

    #[test]
    fn timeout_keeps_partial_line() {
        let reader = TimeoutBetweenChunks {
            chunks: vec![b"AB".to_vec(), b"CD\n".to_vec()],
            timed_out: false,
        };
        let mut source = LineSource::new(reader);

        assert!(source.read_frame().unwrap().is_none());
        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!(frame.as_bytes(), b"ABCD");
    }

    #[test]
    fn discards_over_long_line_and_recovers() {
        let mut wire = vec![b'A'; MAX_LINE_LEN + 600];
        wire.extend_from_slice(b"\nNEXT\n");
        let mut source = LineSource::new(Cursor::new(wire));

        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!(frame.as_bytes(), b"NEXT");
    }

    #[test]
    fn io_error_is_terminal() {
        let mut source = LineSource::new(FailingReader);
        assert!(matches!(source.read_frame(), Err(TransportError::Io(_))));
    }

    struct TimeoutBetweenChunks {
        chunks: Vec<Vec<u8>>,
        timed_out: bool,
    }

    impl Read for TimeoutBetweenChunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.len() == 1 && !self.timed_out {
                self.timed_out = true;
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device unplugged"))
        }
    }
}
