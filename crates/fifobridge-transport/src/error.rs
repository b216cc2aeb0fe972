use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors that can occur in transport and pipe operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create the named pipe object.
    #[error("failed to create named pipe at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open a device or pipe.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to bind a socket to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The pipe path no longer refers to the FIFO this process created.
    #[error("pipe path {0} was replaced")]
    PathReplaced(PathBuf),

    /// An I/O error occurred while reading from the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport reached end of stream.
    #[error("transport closed (end of stream)")]
    Closed,

    /// A synthetic generator failed to produce a frame.
    #[error("generator error: {0}")]
    Generator(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
