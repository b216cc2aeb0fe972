use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cloneable, thread-safe stop request.
///
/// Signal handlers call [`request`](Self::request); the bridge polls
/// [`is_requested`](Self::is_requested) between frames and sleeps through
/// [`wait_timeout`](Self::wait_timeout) so a request cuts any back-off short.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`. Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut requested = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*requested {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            requested = cvar
                .wait_timeout(requested, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *requested
    }
}
