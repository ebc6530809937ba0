use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::debug;
use xxhash_rust::xxh3::Xxh3;

use crate::chunk::render::Renderable;
use crate::chunk::{Chunk, ImpureChunk, RenderPass};
use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::node::Node;

const XXH3_SEED: u64 = 0x51c3_e0a7_2f4d_9b61;

/// One replay step of a [`CompiledSequence`].
#[derive(Clone, Debug)]
pub enum Segment {
    /// Output of one maximal run of consecutive pure chunks, rendered at build time.
    Static(Arc<[u8]>),
    /// One impure chunk, run against the live context on every replay.
    Dynamic(ImpureChunk),
}

/// Stable 128-bit fingerprint of a compiled sequence's layout and static bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

/// A node tree with its pure output baked into bytes.
///
/// Replaying a compiled sequence is observably identical to rendering the original node fresh,
/// for any context. Static segments are immutable and every replay gets its own
/// [`RenderPass`], so one compiled sequence can be replayed from any number of threads.
#[derive(Clone, Debug)]
pub struct CompiledSequence {
    segments: Vec<Segment>,
    static_len: usize,
}

impl CompiledSequence {
    /// Consume `node`'s chunk sequence once, coalescing pure runs into byte buffers.
    ///
    /// Pure chunks are rendered against a background context; impure chunks are kept unexecuted.
    /// Any failure aborts the build and nothing partial is returned.
    #[tracing::instrument(skip(node), fields(kind = node.kind()))]
    pub fn build(node: &Node) -> SluiceResult<Self> {
        let ctx = RenderContext::background();
        let mut pass = RenderPass::new(&ctx);
        let mut segments = Vec::new();
        let mut run: Vec<u8> = Vec::new();
        let mut static_len = 0usize;

        for chunk in node.chunks() {
            match chunk {
                Chunk::Pure(_) => chunk
                    .render(&mut pass, &mut run)
                    .map_err(|e| SluiceError::compile(e.to_string()))?,
                Chunk::Impure(c) => {
                    if !run.is_empty() {
                        static_len += run.len();
                        segments.push(Segment::Static(Arc::from(std::mem::take(&mut run))));
                    }
                    segments.push(Segment::Dynamic(c));
                }
            }
        }
        if !run.is_empty() {
            static_len += run.len();
            segments.push(Segment::Static(Arc::from(run)));
        }

        let compiled = Self {
            segments,
            static_len,
        };
        debug!(
            segments = compiled.segments.len(),
            dynamic = compiled.dynamic_count(),
            static_bytes = compiled.static_len,
            "compiled static tree"
        );
        Ok(compiled)
    }

    /// Replay every segment in build order against `ctx`.
    ///
    /// Fails at the first failing dynamic segment; bytes already written stay written.
    pub fn render(&self, ctx: &RenderContext, out: &mut dyn Write) -> SluiceResult<()> {
        let mut pass = RenderPass::new(ctx);
        for seg in &self.segments {
            match seg {
                Segment::Static(bytes) => out.write_all(bytes)?,
                Segment::Dynamic(chunk) => chunk.render(&mut pass, out)?,
            }
        }
        Ok(())
    }

    /// Segments in replay order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total bytes held in static segments.
    pub fn static_len(&self) -> usize {
        self.static_len
    }

    /// Number of dynamic segments.
    pub fn dynamic_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Dynamic(_)))
            .count()
    }

    /// `true` when replay never touches the context.
    pub fn is_fully_static(&self) -> bool {
        self.dynamic_count() == 0
    }

    /// Fingerprint over static bytes plus one marker per dynamic segment.
    ///
    /// Equal for two builds of the same tree. For a fully static sequence it identifies the
    /// output bytes exactly, so it can serve as a strong ETag.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        for seg in &self.segments {
            match seg {
                Segment::Static(bytes) => {
                    h.update(&[0]);
                    h.update(&(bytes.len() as u64).to_le_bytes());
                    h.update(bytes);
                }
                Segment::Dynamic(chunk) => {
                    h.update(&[1]);
                    h.update(chunk.label().as_bytes());
                }
            }
        }
        let v = h.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

impl Renderable for CompiledSequence {
    fn render_into(&self, ctx: &RenderContext, out: &mut dyn Write) -> SluiceResult<()> {
        self.render(ctx, out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiled.rs"]
mod tests;
