use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::chunk::render::render_node;
use crate::chunk::{Chunk, ImpureChunk, Markup, RenderPass};
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::element::Element;
use crate::tree::node::{Boundary, Component, Node};
use crate::tree::property::apply_resolved;

enum Work {
    Node(Node),
    Chunk(Chunk),
    Fragment { nodes: Arc<[Node]>, next: usize },
    Children { el: Arc<Element>, next: usize },
}

/// Lazy depth-first chunk sequence of one node.
///
/// Nodes are expanded only when the iterator reaches them, so a long document starts producing
/// chunks immediately. Order is document order: an element's open tag, its attribute chunks, `>`,
/// its children's chunks, then its close tag.
pub struct Chunks {
    stack: Vec<Work>,
}

impl Chunks {
    pub(crate) fn new(node: Node) -> Self {
        Self {
            stack: vec![Work::Node(node)],
        }
    }

    fn expand(&mut self, node: Node) -> Option<Chunk> {
        match node {
            Node::Text(t) => Some(Chunk::Pure(Markup::Text(t))),
            Node::Raw(r) => Some(Chunk::Pure(Markup::Raw(r))),
            Node::Fragment(nodes) => {
                self.stack.push(Work::Fragment { nodes, next: 0 });
                None
            }
            Node::Element(el) => Some(self.expand_element(el)),
            Node::Component(c) => Some(Chunk::Impure(component_chunk(c))),
            Node::Boundary(b) => Some(Chunk::Impure(boundary_chunk(b))),
            Node::Deferred(_) => Some(Chunk::Impure(ImpureChunk::new(
                "deferred",
                |_pass, _out| {
                    Err(SluiceError::render(
                        "deferred property rendered outside of an element",
                    ))
                },
            ))),
        }
    }

    fn expand_element(&mut self, el: Arc<Element>) -> Chunk {
        let mut tail: Vec<Work> = Vec::new();

        if el.has_deferred() {
            // The deferred properties may read the context and rewrite the attribute set, so
            // nothing about the attribute string is known until they have all run.
            for idx in 0..el.deferred_properties().len() {
                tail.push(Work::Chunk(Chunk::Impure(deferred_chunk(&el, idx))));
            }
            tail.push(Work::Chunk(Chunk::Impure(finalize_chunk(&el))));
        } else {
            for attr in el.attrs().finalized() {
                tail.push(Work::Chunk(Chunk::Pure(Markup::Attr(attr))));
            }
        }

        tail.push(Work::Chunk(Chunk::Pure(Markup::Static(">"))));
        if !el.is_void() {
            if !el.child_nodes().is_empty() {
                tail.push(Work::Children {
                    el: Arc::clone(&el),
                    next: 0,
                });
            }
            tail.push(Work::Chunk(Chunk::Pure(Markup::CloseTag(Arc::clone(&el)))));
        }

        self.stack.extend(tail.into_iter().rev());
        Chunk::Pure(Markup::OpenTag(el))
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Chunk(chunk) => return Some(chunk),
                Work::Node(node) => {
                    if let Some(chunk) = self.expand(node) {
                        return Some(chunk);
                    }
                }
                Work::Fragment { nodes, next } => {
                    if let Some(child) = nodes.get(next).cloned() {
                        self.stack.push(Work::Fragment {
                            nodes,
                            next: next + 1,
                        });
                        self.stack.push(Work::Node(child));
                    }
                }
                Work::Children { el, next } => {
                    if let Some(child) = el.child_nodes().get(next).cloned() {
                        self.stack.push(Work::Children { el, next: next + 1 });
                        self.stack.push(Work::Node(child));
                    }
                }
            }
        }
        None
    }
}

impl Node {
    /// Chunk sequence of this node in document order.
    pub fn chunks(&self) -> Chunks {
        Chunks::new(self.clone())
    }
}

/// Run user render code, turning a panic into a render error.
fn guarded<T>(what: &'static str, f: impl FnOnce() -> SluiceResult<T>) -> SluiceResult<T> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(SluiceError::render(format!("{what} panicked"))))
}

fn deferred_chunk(el: &Arc<Element>, idx: usize) -> ImpureChunk {
    let el = Arc::clone(el);
    ImpureChunk::new("deferred", move |pass, _out| {
        let ctx = pass.ctx();
        if idx == 0 {
            pass.open_attrs = Some(el.attrs().clone());
        }
        let prop = guarded("deferred property", || {
            el.deferred_properties()[idx].resolve(ctx)
        })?;
        let attrs = pass
            .open_attrs
            .get_or_insert_with(|| el.attrs().clone());
        apply_resolved(attrs, prop, ctx)
    })
}

fn finalize_chunk(el: &Arc<Element>) -> ImpureChunk {
    let el = Arc::clone(el);
    ImpureChunk::new("attrs", move |pass, out| {
        let attrs = pass
            .open_attrs
            .take()
            .unwrap_or_else(|| el.attrs().clone());
        attrs.write_to(out)?;
        Ok(())
    })
}

fn component_chunk(c: Component) -> ImpureChunk {
    ImpureChunk::new("component", move |pass, out| {
        let node = guarded("component", || c.expand(pass.ctx()))?;
        render_node(&node, pass, out)
    })
}

fn boundary_chunk(b: Arc<Boundary>) -> ImpureChunk {
    ImpureChunk::new("boundary", move |pass, out| {
        let mut buf = Vec::new();
        let mut inner = RenderPass::new(pass.ctx());
        match render_node(&b.node, &mut inner, &mut buf) {
            Ok(()) => out.write_all(&buf)?,
            Err(err) if err.is_canceled() => return Err(err),
            Err(err) => {
                warn!(error = %err, "boundary caught render error, rendering fallback");
                let fallback = guarded("boundary fallback", || Ok(b.fallback_for(&err)))?;
                render_node(&fallback, pass, out)?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/chunk/sequencer.rs"]
mod tests;
