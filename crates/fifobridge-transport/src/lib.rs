//! Sensor transports and the named-pipe endpoint.
//!
//! This is the lowest layer of fifobridge. It knows how to pull raw frames out of a
//! device and how to own the FIFO that downstream consumers read from:
//! - Serial lines carrying newline-terminated records ([`LineSource`])
//! - UDP sockets carrying datagrams ([`UdpSource`])
//! - Filesystem FIFOs ([`NamedPipe`], Unix only)
//!
//! Everything above this crate talks to transports through [`FrameSource`] and to the
//! pipe through [`PipeEndpoint`].

pub mod error;
pub mod serial;
pub mod traits;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod poll;
#[cfg(unix)]
pub mod udp;

pub use error::{Result, TransportError};
pub use serial::{LineSource, SerialConfig, SerialSource};
pub use traits::{FrameSource, PipeEndpoint, PipeWriter, RawFrame};

#[cfg(unix)]
pub use fifo::{FifoWriter, NamedPipe};
#[cfg(unix)]
pub use poll::PollingReader;
#[cfg(unix)]
pub use udp::{UdpConfig, UdpSource};
