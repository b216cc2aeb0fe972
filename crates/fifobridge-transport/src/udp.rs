use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::{FrameSource, RawFrame};

/// UDP receiver settings.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind.
    pub bind: SocketAddrV4,
    /// Largest datagram accepted per read; longer datagrams are truncated.
    pub max_datagram: usize,
    /// Longest time a single receive blocks before reporting "no frame yet".
    pub poll_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 4353),
            max_datagram: 256,
            poll_timeout: Duration::from_millis(250),
        }
    }
}

/// Datagram transport: every received datagram is one frame.
pub struct UdpSource {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpSource {
    /// Bind a UDP socket with address reuse enabled.
    pub fn bind(config: &UdpConfig) -> Result<Self> {
        let bind_err = |source| TransportError::Bind {
            addr: SocketAddr::V4(config.bind),
            source,
        };

        let socket = bind_reuse_addr(config.bind).map_err(bind_err)?;
        socket
            .set_read_timeout(Some(config.poll_timeout))
            .map_err(bind_err)?;

        info!(addr = %config.bind, "listening for datagrams");

        Ok(Self {
            socket,
            buf: vec![0u8; config.max_datagram],
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }
}

impl FrameSource for UdpSource {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        match self.socket.recv(&mut self.buf) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(RawFrame::new(Bytes::copy_from_slice(&self.buf[..n])))),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn transport_name(&self) -> &'static str {
        "udp"
    }
}

/// `std::net::UdpSocket::bind` offers no way to set `SO_REUSEADDR` before binding.
fn bind_reuse_addr(addr: SocketAddrV4) -> std::io::Result<UdpSocket> {
    // SAFETY: plain syscall without pointer arguments; the result is checked below.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `fd` was just returned by socket() and is not owned by anything else.
    let owned = unsafe { OwnedFd::from_raw_fd(fd) };

    let enable: libc::c_int = 1;
    // SAFETY: `enable` is a valid readable c_int for the given length.
    let rc = unsafe {
        libc::setsockopt(
            owned.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&enable as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: sockaddr_in is plain old data; all-zero is a valid initial value.
    let mut sockaddr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
    sockaddr.sin_port = addr.port().to_be();
    sockaddr.sin_addr = libc::in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };

    // SAFETY: `sockaddr` is a valid sockaddr_in and the length matches its size.
    let rc = unsafe {
        libc::bind(
            owned.as_raw_fd(),
            (&sockaddr as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(UdpSocket::from(owned))
}
