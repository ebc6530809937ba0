use std::io::{self, Write};

/// Status line and headers of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Header pairs in send order.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Head with a status and no headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// `200` with an HTML content type.
    pub fn html() -> Self {
        Self::new(200).header("content-type", "text/html; charset=utf-8")
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first `content-type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self::html()
    }
}

/// The network side of a response: a byte sink that can also carry a status and headers.
///
/// `flush` must push everything written so far towards the client.
pub trait Transport: Write {
    /// Send the status line and headers. Called exactly once, before the first body byte.
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()>;
}

/// Transport that ignores the head and writes the body as is (files, stdout, pipes).
#[derive(Debug, Default)]
pub struct PlainTransport<W> {
    inner: W,
}

impl<W: Write> PlainTransport<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PlainTransport<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Transport for PlainTransport<W> {
    fn send_head(&mut self, _head: &ResponseHead) -> io::Result<()> {
        Ok(())
    }
}

/// HTTP/1.1 response with `Transfer-Encoding: chunked` body framing.
///
/// Each body write becomes one chunk on the wire, so a client sees flushed output as soon as
/// it is written. Call [`ChunkedHttp::finish`] to send the terminating chunk.
#[derive(Debug)]
pub struct ChunkedHttp<W> {
    inner: W,
    finished: bool,
}

impl<W: Write> ChunkedHttp<W> {
    /// Wrap a connection.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    /// Write the zero-length terminating chunk and flush. Idempotent.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.inner.write_all(b"0\r\n\r\n")?;
        self.inner.flush()
    }

    /// Recover the connection.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ChunkedHttp<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("chunked body already finished"));
        }
        // A zero-length chunk would terminate the body.
        if buf.is_empty() {
            return Ok(0);
        }
        write!(self.inner, "{:x}\r\n", buf.len())?;
        self.inner.write_all(buf)?;
        self.inner.write_all(b"\r\n")?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Transport for ChunkedHttp<W> {
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()> {
        write!(self.inner, "HTTP/1.1 {} {}\r\n", head.status, head.reason())?;
        for (name, value) in &head.headers {
            write!(self.inner, "{name}: {value}\r\n")?;
        }
        self.inner.write_all(b"transfer-encoding: chunked\r\n\r\n")
    }
}

/// In-memory transport for tests and debugging.
///
/// Records the head, the full body, and the bytes delivered by each flush.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    head: Option<ResponseHead>,
    body: Vec<u8>,
    pending: Vec<u8>,
    flushed: Vec<Vec<u8>>,
    flush_calls: usize,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Head captured by `send_head`, if any.
    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Every body byte written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 (lossy).
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body bytes grouped by the flush that delivered them. Empty flushes are not recorded.
    pub fn flushed(&self) -> &[Vec<u8>] {
        &self.flushed
    }

    /// Number of `flush` calls, including empty ones.
    pub fn flush_calls(&self) -> usize {
        self.flush_calls
    }

    /// Bytes written but not yet flushed.
    pub fn unflushed(&self) -> &[u8] {
        &self.pending
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_calls += 1;
        if !self.pending.is_empty() {
            self.flushed.push(std::mem::take(&mut self.pending));
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()> {
        if self.head.is_some() {
            return Err(io::Error::other("head sent twice"));
        }
        self.head = Some(head.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/transport.rs"]
mod tests;
