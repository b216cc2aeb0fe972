use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::poll::wait_fd;
use crate::traits::{PipeEndpoint, PipeWriter};

/// Filesystem FIFO owned by this process.
///
/// The FIFO is created once and may be reopened for writing any number of times as
/// consumers come and go. It is removed on drop, on every exit path, as long as the
/// path still refers to the FIFO created here.
pub struct NamedPipe {
    path: PathBuf,
    created_inode: (u64, u64),
}

impl NamedPipe {
    /// Default permission mode for created pipes.
    pub const DEFAULT_PIPE_MODE: u32 = 0o600;

    /// Create a FIFO at `path`.
    ///
    /// Fails if anything already exists at `path`; a stale pipe left by a crashed
    /// process must be removed by the operator.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_mode(path, Self::DEFAULT_PIPE_MODE)
    }

    /// Create a FIFO at `path` with an explicit mode.
    pub fn create_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let create_err = |source| TransportError::Create {
            path: path.clone(),
            source,
        };

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            create_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path contains a NUL byte",
            ))
        })?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            return Err(create_err(std::io::Error::last_os_error()));
        }

        // mkfifo is filtered by the umask; apply the requested mode explicitly.
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(create_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(create_err)?;

        info!(?path, "created named pipe");

        Ok(Self {
            path,
            created_inode: (metadata.dev(), metadata.ino()),
        })
    }

    /// Whether `path` still refers to the FIFO created by this endpoint.
    pub fn is_intact(&self) -> bool {
        match std::fs::symlink_metadata(&self.path) {
            Ok(metadata) => {
                metadata.file_type().is_fifo()
                    && (metadata.dev(), metadata.ino()) == self.created_inode
            }
            Err(_) => false,
        }
    }

    /// Open the pipe for writing, blocking until a reader attaches.
    pub fn open_writer(&self) -> Result<File> {
        self.ensure_intact()?;
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| self.open_error(e))?;
        debug!(path = ?self.path, "reader attached");
        Ok(file)
    }

    fn ensure_intact(&self) -> Result<()> {
        if self.is_intact() {
            Ok(())
        } else {
            Err(TransportError::PathReplaced(self.path.clone()))
        }
    }

    fn open_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Open {
            path: self.path.clone(),
            source,
        }
    }
}

impl PipeEndpoint for NamedPipe {
    type Writer = FifoWriter;

    fn try_open_writer(&self) -> Result<Option<FifoWriter>> {
        self.ensure_intact()?;

        let file = match OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
        {
            Ok(file) => file,
            // No reader has the FIFO open yet.
            Err(err) if err.raw_os_error() == Some(libc::ENXIO) => return Ok(None),
            Err(err) => return Err(self.open_error(err)),
        };

        debug!(path = ?self.path, "reader attached");
        Ok(Some(FifoWriter { file }))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Write end of a [`NamedPipe`], left in non-blocking mode.
///
/// A consumer that stops reading fills the pipe; writes then fail with `WouldBlock`
/// instead of hanging the process.
#[derive(Debug)]
pub struct FifoWriter {
    file: File,
}

impl Write for FifoWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl PipeWriter for FifoWriter {
    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool> {
        wait_fd(self.file.as_raw_fd(), libc::POLLOUT, timeout)
    }
}

impl AsRawFd for FifoWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for NamedPipe {
    fn drop(&mut self) {
        if self.is_intact() {
            debug!(path = ?self.path, "removing named pipe");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(
                path = ?self.path,
                "pipe path identity changed; skipping cleanup"
            );
        }
    }
}

impl std::fmt::Debug for NamedPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedPipe")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{ErrorKind, Read};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fifobridge-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_write_read_and_cleanup() {
        let dir = temp_dir("fifo-rw");
        let pipe_path = dir.join("imufifo");

        let pipe = NamedPipe::create(&pipe_path).unwrap();
        let metadata = std::fs::symlink_metadata(&pipe_path).unwrap();
        assert!(metadata.file_type().is_fifo());

        let reader_path = pipe_path.clone();
        let reader = std::thread::spawn(move || {
            let mut file = File::open(reader_path).unwrap();
            let mut buf = [0u8; 5];
            file.read_exact(&mut buf).unwrap();
            buf
        });

        let mut writer = pipe.open_writer().unwrap();
        writer.write_all(b"hello").unwrap();
        writer.flush().unwrap();
        assert_eq!(&reader.join().unwrap(), b"hello");

        drop(writer);
        drop(pipe);
        assert!(!pipe_path.exists(), "pipe should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_fails_when_path_exists() {
        let dir = temp_dir("fifo-exists");
        let pipe_path = dir.join("gpsfifo");
        std::fs::write(&pipe_path, b"occupied").unwrap();

        let result = NamedPipe::create(&pipe_path);
        match result {
            Err(TransportError::Create { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists)
            }
            other => panic!("expected create error, got {other:?}"),
        }
        assert_eq!(std::fs::read(&pipe_path).unwrap(), b"occupied");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_applies_mode() {
        let dir = temp_dir("fifo-mode");
        let pipe_path = dir.join("imufifo");

        let pipe = NamedPipe::create(&pipe_path).unwrap();
        let mode = std::fs::metadata(&pipe_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(pipe);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn try_open_writer_without_reader_returns_none() {
        let dir = temp_dir("fifo-noreader");
        let pipe = NamedPipe::create(dir.join("imufifo")).unwrap();

        assert!(pipe.try_open_writer().unwrap().is_none());
        assert!(pipe.is_intact());

        drop(pipe);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn try_open_writer_with_reader_stays_non_blocking() {
        let dir = temp_dir("fifo-reader");
        let pipe_path = dir.join("imufifo");
        let pipe = NamedPipe::create(&pipe_path).unwrap();

        let mut reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&pipe_path)
            .unwrap();

        let mut writer = pipe.try_open_writer().unwrap().expect("reader is attached");
        // SAFETY: the descriptor is owned by `writer` and open.
        let flags = unsafe { libc::fcntl(writer.as_raw_fd(), libc::F_GETFL) };
        assert_ne!(flags & libc::O_NONBLOCK, 0);

        writer.write_all(b"abc").unwrap();
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");

        drop(writer);
        drop(pipe);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stalled_reader_fills_pipe_without_blocking() {
        let dir = temp_dir("fifo-stalled");
        let pipe_path = dir.join("gpsfifo");
        let pipe = NamedPipe::create(&pipe_path).unwrap();

        let mut reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&pipe_path)
            .unwrap();
        let mut writer = pipe.try_open_writer().unwrap().expect("reader is attached");

        let chunk = [0x55u8; 4096];
        let mut filled = 0usize;
        loop {
            match writer.write(&chunk) {
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => panic!("unexpected write error: {err}"),
            }
        }
        assert!(filled > 0);
        assert!(!writer
            .wait_writable(Duration::from_millis(20))
            .expect("poll should succeed"));

        let mut drain = vec![0u8; filled];
        reader.read_exact(&mut drain).unwrap();
        assert!(writer
            .wait_writable(Duration::from_millis(20))
            .expect("poll should succeed"));

        drop(writer);
        drop(pipe);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn detached_reader_wakes_waiting_writer() {
        let dir = temp_dir("fifo-detach");
        let pipe_path = dir.join("imufifo");
        let pipe = NamedPipe::create(&pipe_path).unwrap();

        let reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&pipe_path)
            .unwrap();
        let mut writer = pipe.try_open_writer().unwrap().expect("reader is attached");
        drop(reader);

        assert!(writer
            .wait_writable(Duration::from_millis(20))
            .expect("poll should succeed"));
        let err = writer.write(b"x").expect_err("write should fail without a reader");
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);

        drop(writer);
        drop(pipe);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = temp_dir("fifo-replaced");
        let pipe_path = dir.join("imufifo");
        let pipe = NamedPipe::create(&pipe_path).unwrap();

        std::fs::remove_file(&pipe_path).unwrap();
        std::fs::write(&pipe_path, b"replacement").unwrap();

        assert!(!pipe.is_intact());
        assert!(matches!(
            pipe.try_open_writer(),
            Err(TransportError::PathReplaced(_))
        ));

        drop(pipe);
        assert!(
            pipe_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
