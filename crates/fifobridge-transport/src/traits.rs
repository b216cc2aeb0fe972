use std::io::Write;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// One frame exactly as received from a transport, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    data: Bytes,
}

impl RawFrame {
    /// Create a frame from received bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// The received bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// A byte-producing device that yields one frame per read.
///
/// Implementations block for at most a short poll interval. `Ok(None)` means no
/// complete frame arrived in that window; callers use it to observe shutdown.
/// Errors are terminal for the current transport handle.
pub trait FrameSource {
    /// Read the next frame.
    fn read_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        (**self).read_frame()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

/// A non-blocking pipe writer.
///
/// Writes into a full pipe fail with `WouldBlock`; the caller waits for room with
/// [`PipeWriter::wait_writable`] and can give up between waits.
pub trait PipeWriter: Write {
    /// Wait at most `timeout` for room in the pipe.
    ///
    /// `Ok(true)` means the next write will make progress or report why it cannot
    /// (e.g. the consumer detached). `Ok(false)` means the timeout elapsed.
    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool>;
}

/// The sink side of the bridge: a filesystem endpoint that can be reopened for writing.
pub trait PipeEndpoint {
    /// Writer handle returned once a consumer is attached.
    type Writer: PipeWriter;

    /// Try to open the endpoint for writing.
    ///
    /// Returns `Ok(None)` while no consumer has the endpoint open for reading.
    fn try_open_writer(&self) -> Result<Option<Self::Writer>>;

    /// Filesystem path of the endpoint.
    fn path(&self) -> &Path;
}
