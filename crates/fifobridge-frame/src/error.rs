/// Errors that can occur while decoding, transcoding or writing records.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not have the contract length.
    #[error("invalid frame length ({len} characters, expected {expected})")]
    InvalidLength { len: usize, expected: usize },

    /// The frame contains characters that are not hex digits.
    #[error("frame is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The record layout does not tile the record exactly.
    #[error("invalid record layout: {0}")]
    InvalidLayout(String),

    /// An I/O error occurred while writing records.
    #[error("record I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The consumer closed the pipe (zero-length write).
    #[error("consumer closed the pipe")]
    ConnectionClosed,

    /// The caller gave up waiting for room in the pipe.
    #[error("record write abandoned")]
    Cancelled,
}

impl FrameError {
    /// Whether this error means the consumer went away.
    pub fn is_consumer_detached(&self) -> bool {
        match self {
            FrameError::ConnectionClosed => true,
            FrameError::Io(err) => err.kind() == std::io::ErrorKind::BrokenPipe,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
