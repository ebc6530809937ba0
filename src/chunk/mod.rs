//! Chunk decomposition: the unit of output between a node tree and a byte sink.
//!
//! A node renders as an ordered sequence of chunks. A *pure* chunk is a [`Markup`] value with no
//! access to any context, so its bytes are fixed at tree-construction time and may be computed
//! once and cached. An *impure* chunk is a closure that receives the live [`RenderPass`] every
//! time it runs.

/// Rendering entry points and the `Renderable` trait.
pub mod render;
/// Lazy depth-first chunk iteration over a node tree.
pub mod sequencer;

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::foundation::context::RenderContext;
use crate::foundation::error::SluiceResult;
use crate::foundation::escape::write_escaped;
use crate::tree::attrs::{AttrSet, Attribute};
use crate::tree::element::Element;

/// Per-render scratch state threaded through every chunk of one render.
///
/// Holds the attribute set of the element whose open tag is being written, so deferred
/// properties mutate render-local state rather than the shared element.
pub struct RenderPass<'a> {
    ctx: &'a RenderContext,
    pub(crate) open_attrs: Option<AttrSet>,
}

impl<'a> RenderPass<'a> {
    /// Start a render against `ctx`.
    pub fn new(ctx: &'a RenderContext) -> Self {
        Self {
            ctx,
            open_attrs: None,
        }
    }

    /// The live render context.
    pub fn ctx(&self) -> &'a RenderContext {
        self.ctx
    }
}

/// Context-free output of a pure chunk.
#[derive(Clone)]
pub enum Markup {
    /// Fixed punctuation such as `>`.
    Static(&'static str),
    /// Escaped text.
    Text(std::borrow::Cow<'static, str>),
    /// Verbatim markup.
    Raw(std::borrow::Cow<'static, str>),
    /// One finalized attribute, with its leading space.
    Attr(Attribute),
    /// `<tag`
    OpenTag(Arc<Element>),
    /// `</tag>`
    CloseTag(Arc<Element>),
}

impl Markup {
    /// Write the markup bytes.
    pub fn write(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Markup::Static(s) => out.write_all(s.as_bytes()),
            Markup::Text(t) => write_escaped(out, t),
            Markup::Raw(r) => out.write_all(r.as_bytes()),
            Markup::Attr(a) => a.write_to(out),
            Markup::OpenTag(el) => {
                out.write_all(b"<")?;
                out.write_all(el.tag().as_bytes())
            }
            Markup::CloseTag(el) => {
                out.write_all(b"</")?;
                out.write_all(el.tag().as_bytes())?;
                out.write_all(b">")
            }
        }
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Static(s) => write!(f, "Static({s:?})"),
            Markup::Text(t) => write!(f, "Text({t:?})"),
            Markup::Raw(r) => write!(f, "Raw({r:?})"),
            Markup::Attr(a) => write!(f, "Attr({:?})", a.key()),
            Markup::OpenTag(el) => write!(f, "OpenTag({:?})", el.tag()),
            Markup::CloseTag(el) => write!(f, "CloseTag({:?})", el.tag()),
        }
    }
}

type ImpureFn = dyn Fn(&mut RenderPass<'_>, &mut dyn Write) -> SluiceResult<()> + Send + Sync;

/// A chunk that must run against the live context on every render.
#[derive(Clone)]
pub struct ImpureChunk {
    label: &'static str,
    f: Arc<ImpureFn>,
}

impl ImpureChunk {
    /// Wrap a render closure. `label` only shows up in diagnostics.
    pub fn new(
        label: &'static str,
        f: impl Fn(&mut RenderPass<'_>, &mut dyn Write) -> SluiceResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label,
            f: Arc::new(f),
        }
    }

    /// Diagnostic label (`component`, `deferred`, `attrs`, ...).
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run the chunk.
    pub fn render(&self, pass: &mut RenderPass<'_>, out: &mut dyn Write) -> SluiceResult<()> {
        (self.f)(pass, out)
    }
}

impl fmt::Debug for ImpureChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImpureChunk({})", self.label)
    }
}

/// One write step of a node's rendering.
#[derive(Clone, Debug)]
pub enum Chunk {
    /// Output independent of the render context.
    Pure(Markup),
    /// Output computed against the live context.
    Impure(ImpureChunk),
}

impl Chunk {
    /// `true` for context-independent chunks.
    pub fn is_pure(&self) -> bool {
        matches!(self, Chunk::Pure(_))
    }

    /// Write this chunk.
    pub fn render(&self, pass: &mut RenderPass<'_>, out: &mut dyn Write) -> SluiceResult<()> {
        match self {
            Chunk::Pure(m) => Ok(m.write(out)?),
            Chunk::Impure(c) => c.render(pass, out),
        }
    }
}
