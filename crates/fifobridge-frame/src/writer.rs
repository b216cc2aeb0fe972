use std::io::{ErrorKind, Write};

use crate::error::{FrameError, Result};

/// Writes complete records to any `Write` stream, flushing after each one.
///
/// A record is either written whole or the call fails; callers never have to track
/// partial writes. Consumer loss surfaces as an error for which
/// [`FrameError::is_consumer_detached`] is true.
pub struct RecordWriter<T> {
    inner: T,
    records_written: u64,
}

impl<T: Write> RecordWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    /// Write one record and flush.
    ///
    /// A non-blocking stream that is full fails the call with `WouldBlock`; use
    /// [`RecordWriter::write_record_with`] to wait for room instead.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.write_record_with(record, |_| Err(std::io::Error::from(ErrorKind::WouldBlock)))
    }

    /// Write one record and flush, calling `wait` whenever the stream is full.
    ///
    /// `wait` blocks until the stream can take more bytes and returns `Ok(true)`, or
    /// returns `Ok(false)` to abandon the record with [`FrameError::Cancelled`]. An
    /// abandoned record may have been written in part, so the stream must not be
    /// reused afterwards.
    pub fn write_record_with<F>(&mut self, record: &[u8], mut wait: F) -> Result<()>
    where
        F: FnMut(&T) -> std::io::Result<bool>,
    {
        let mut offset = 0usize;
        while offset < record.len() {
            match self.inner.write(&record[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if !wait(&self.inner)? {
                        return Err(FrameError::Cancelled);
                    }
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Records successfully written through this writer.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}
