use std::io::{self, Write};

use tracing::trace;

use crate::config::StreamOpts;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::stream::transport::{ResponseHead, Transport};

/// Buffered response writer over a [`Transport`].
///
/// Writes accumulate in memory; once the buffer reaches the threshold it is copied to the
/// transport and the transport is flushed. [`StreamWriter::checkpoint`] forces the same copy and
/// flush at points where the client should see progress (end of the main document, each async
/// slot).
///
/// The head goes out exactly once, immediately before the first body bytes reach the transport.
/// Until then nothing is committed and [`StreamWriter::discard_uncommitted`] can still throw the
/// buffered output away, e.g. to send an error page instead.
pub struct StreamWriter<T: Transport> {
    transport: T,
    buf: Vec<u8>,
    threshold: usize,
    error_page: bool,
    head: Option<ResponseHead>,
    head_set: bool,
    committed: bool,
    bytes_sent: u64,
    flushes: u64,
}

impl<T: Transport> StreamWriter<T> {
    /// Writer using `opts.buffer_bytes` as its threshold.
    pub fn new(transport: T, opts: &StreamOpts) -> Self {
        let mut writer = Self::with_threshold(transport, opts.buffer_bytes);
        writer.error_page = opts.error_page;
        writer
    }

    /// Writer with an explicit threshold (clamped to at least one byte).
    pub fn with_threshold(transport: T, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            transport,
            buf: Vec::with_capacity(threshold),
            threshold,
            error_page: true,
            head: None,
            head_set: false,
            committed: false,
            bytes_sent: 0,
            flushes: 0,
        }
    }

    /// Set the status and headers. Allowed once, and only before anything is committed.
    pub fn set_head(&mut self, head: ResponseHead) -> SluiceResult<()> {
        if self.committed {
            return Err(SluiceError::response(
                "response head set after body bytes were sent",
            ));
        }
        if self.head_set {
            return Err(SluiceError::response("response head already set"));
        }
        self.head = Some(head);
        self.head_set = true;
        Ok(())
    }

    /// `true` once the head and at least the first flush went out.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Drop buffered bytes and any pending head, if nothing has been committed yet.
    ///
    /// Returns `false` (and changes nothing) when output already reached the transport.
    pub fn discard_uncommitted(&mut self) -> bool {
        if self.committed {
            return false;
        }
        self.buf.clear();
        self.head = None;
        self.head_set = false;
        true
    }

    /// Copy buffered bytes to the transport and flush it.
    pub fn checkpoint(&mut self) -> SluiceResult<()> {
        self.drain_buffer()?;
        Ok(())
    }

    fn commit(&mut self) -> io::Result<()> {
        if self.committed {
            return Ok(());
        }
        let head = self.head.take().unwrap_or_default();
        self.transport.send_head(&head)?;
        self.committed = true;
        self.head_set = true;
        Ok(())
    }

    fn drain_buffer(&mut self) -> io::Result<()> {
        self.commit()?;
        let n = self.buf.len();
        if n > 0 {
            self.transport.write_all(&self.buf)?;
            self.buf.clear();
            self.bytes_sent += n as u64;
        }
        self.transport.flush()?;
        self.flushes += 1;
        trace!(bytes = n, total = self.bytes_sent, "flushed response buffer");
        Ok(())
    }

    /// Bytes waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Body bytes handed to the transport so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Number of transport flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Buffer threshold in bytes.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a failed render may be replaced by an error page while nothing is committed.
    pub fn error_page_enabled(&self) -> bool {
        self.error_page
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Recover the transport. Call [`StreamWriter::checkpoint`] first; buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: Transport> Write for StreamWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        if self.buf.len() >= self.threshold {
            self.drain_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_buffer()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/writer.rs"]
mod tests;
