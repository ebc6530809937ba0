use std::io::Write;

use tracing::{debug, warn};

use crate::chunk::render::{Renderable, render};
use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::stream::slots::{AsyncSlots, DrainReport};
use crate::stream::transport::{ResponseHead, Transport};
use crate::stream::writer::StreamWriter;
use crate::tree::element::el;
use crate::tree::node::{Node, doctype, fragment};

/// Summary of one streamed response.
#[derive(Debug, Default)]
pub struct StreamReport {
    /// Body bytes handed to the transport.
    pub bytes_sent: u64,
    /// Transport flushes performed.
    pub flushes: u64,
    /// Outcome of the async slot drain.
    pub drain: DrainReport,
    /// Main render error that was replaced by the error page.
    pub replaced_error: Option<SluiceError>,
}

impl StreamReport {
    /// `true` when the client got the error page instead of the document.
    pub fn served_error_page(&self) -> bool {
        self.replaced_error.is_some()
    }
}

/// Built-in page sent when the main render fails before anything was committed.
pub fn error_page() -> Node {
    fragment([
        doctype(),
        el("html")
            .child(el("head").child(el("title").child("500 Internal Server Error")))
            .child(el("body").child(el("h1").child("Internal Server Error")))
            .into(),
    ])
}

/// Stream one page: main document, final flush, then the async slots in registration order.
///
/// If the main render fails while nothing has been committed and the writer allows it, the
/// buffered output is discarded, pending slots are aborted and the error page is sent with
/// status 500. A failure after the first flush cannot be rolled back: whatever was buffered is
/// flushed, the slots are aborted and the error is returned, leaving a truncated response.
#[tracing::instrument(skip_all, fields(slots = slots.len()))]
pub async fn stream_page<T: Transport>(
    ctx: &RenderContext,
    page: &dyn Renderable,
    slots: &AsyncSlots,
    writer: &mut StreamWriter<T>,
) -> SluiceResult<StreamReport> {
    let mut report = StreamReport::default();

    if let Err(err) = page.render_into(ctx, writer) {
        slots.abort_all();
        if writer.error_page_enabled() && writer.discard_uncommitted() {
            warn!(error = %err, "main render failed before commit; sending error page");
            writer.set_head(ResponseHead::new(500).header("content-type", "text/html; charset=utf-8"))?;
            render(&error_page(), &RenderContext::background(), writer)?;
            writer.checkpoint()?;
            report.bytes_sent = writer.bytes_sent();
            report.flushes = writer.flushes();
            report.replaced_error = Some(err);
            return Ok(report);
        }
        warn!(error = %err, committed = writer.is_committed(), "main render failed; response truncated");
        // Best effort: the response is already broken, keep the original error.
        let _ = writer.flush();
        return Err(err);
    }

    // Slot content is always delivered strictly after this flush.
    if let Err(err) = writer.checkpoint() {
        warn!(error = %err, "main document flush failed; aborting slots");
        slots.abort_all();
        return Err(err);
    }
    debug!(bytes = writer.bytes_sent(), "main document flushed");

    report.drain = slots.drain(writer).await?;
    report.bytes_sent = writer.bytes_sent();
    report.flushes = writer.flushes();
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/stream/response.rs"]
mod tests;
