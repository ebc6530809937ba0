//! Streaming responses: transports, the buffered writer, async slots and the page driver.

/// End-to-end page streaming and the error page.
pub mod response;
/// Async slots rendered on background tasks.
pub mod slots;
/// Byte sinks for streamed responses.
pub mod transport;
/// Buffered writer with checkpoint flushes.
pub mod writer;
