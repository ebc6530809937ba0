//! Sluice is an incremental HTML rendering engine for streaming HTTP responses.
//!
//! A page is a declarative [`Node`] tree. Rendering decomposes it into an ordered sequence of
//! chunks that are either *pure* (bytes fixed at construction time) or *impure* (computed from
//! the live [`RenderContext`]). On top of that:
//!
//! - [`CompiledSequence`] pre-renders the pure runs of a tree once and replays them per request,
//!   with [`StaticCache`] as the explicit per-process cache
//! - [`StreamWriter`] buffers output and flushes it to a [`Transport`] at checkpoints
//! - [`AsyncSlots`] lets slow subtrees render in background tasks; placeholders go out inline
//!   and the real content follows the main document in registration order
//! - [`stream_page`] drives one response end to end
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Chunk decomposition and rendering entry points.
pub mod chunk;
/// Static compilation and caching.
pub mod compile;
/// Streaming configuration.
pub mod config;
/// Streaming responses and async slots.
pub mod stream;
/// Node tree model.
pub mod tree;

pub use crate::foundation::context::RenderContext;
pub use crate::foundation::error::{SluiceError, SluiceResult};
pub use crate::foundation::escape::escape_html;

pub use crate::chunk::render::{Renderable, render, render_node, render_to_string, render_to_vec};
pub use crate::chunk::sequencer::Chunks;
pub use crate::chunk::{Chunk, ImpureChunk, Markup, RenderPass};
pub use crate::compile::cache::{CacheStats, StaticCache};
pub use crate::compile::compiled::{CompiledSequence, Fingerprint, Segment};
pub use crate::config::{DEFAULT_BUFFER_BYTES, StreamOpts};
pub use crate::stream::response::{StreamReport, error_page, stream_page};
pub use crate::stream::slots::{AsyncSlots, DrainReport, SLOT_ATTR, Slot, SlotId, SlotState};
pub use crate::stream::transport::{
    ChunkedHttp, MemoryTransport, PlainTransport, ResponseHead, Transport,
};
pub use crate::stream::writer::StreamWriter;
pub use crate::tree::attrs::{AttrSet, AttrValue, Attribute, CLASS_KEY};
pub use crate::tree::element::{Element, el, is_void_tag};
pub use crate::tree::node::{
    Boundary, Component, Node, boundary, component, deferred, doctype, fragment, raw, text,
};
pub use crate::tree::property::{
    DeferredProperty, Property, apply_to_child, attr, bool_attr, class, unique_attr,
};
