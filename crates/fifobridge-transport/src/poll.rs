use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

/// Wait at most `timeout` for `events` on `fd`.
///
/// Returns `Ok(true)` when the descriptor is ready or in an error/hang-up state, so the
/// following read or write reports the condition itself. A signal interrupting the wait
/// counts as a timeout.
pub(crate) fn wait_fd(fd: RawFd, events: libc::c_short, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `pfd` is a valid pollfd for the duration of the call and the count is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

/// A reader over a descriptor whose reads time out instead of blocking forever.
///
/// A read that finds nothing within the timeout fails with `TimedOut`, which
/// [`LineSource`](crate::LineSource) reports as "no frame yet". Wrap unbuffered
/// handles only: data sitting in a user-space buffer is invisible to `poll`.
#[derive(Debug)]
pub struct PollingReader<R> {
    inner: R,
    timeout: Duration,
}

impl<R: Read + AsRawFd> PollingReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + AsRawFd> Read for PollingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !wait_fd(self.inner.as_raw_fd(), libc::POLLIN, self.timeout)? {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        self.inner.read(buf)
    }
}
