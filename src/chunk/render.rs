use std::io::Write;

use crate::chunk::RenderPass;
use crate::foundation::context::RenderContext;
use crate::foundation::error::SluiceResult;
use crate::tree::node::Node;

/// Something that can be written for a request: a fresh node tree or a compiled sequence.
pub trait Renderable: Send + Sync {
    /// Write the full output against `ctx`.
    fn render_into(&self, ctx: &RenderContext, out: &mut dyn Write) -> SluiceResult<()>;
}

impl Renderable for Node {
    fn render_into(&self, ctx: &RenderContext, out: &mut dyn Write) -> SluiceResult<()> {
        render(self, ctx, out)
    }
}

/// Render every chunk of `node` into `out` within an existing pass.
///
/// Stops at the first failing chunk. Bytes already written stay written.
pub fn render_node(node: &Node, pass: &mut RenderPass<'_>, out: &mut dyn Write) -> SluiceResult<()> {
    for chunk in node.chunks() {
        chunk.render(pass, out)?;
    }
    Ok(())
}

/// Render `node` against `ctx` into `out`.
pub fn render(node: &Node, ctx: &RenderContext, out: &mut dyn Write) -> SluiceResult<()> {
    let mut pass = RenderPass::new(ctx);
    render_node(node, &mut pass, out)
}

/// Render `node` into a byte vector.
pub fn render_to_vec(node: &Node, ctx: &RenderContext) -> SluiceResult<Vec<u8>> {
    let mut out = Vec::new();
    render(node, ctx, &mut out)?;
    Ok(out)
}

/// Render `node` into a string.
pub fn render_to_string(node: &Node, ctx: &RenderContext) -> SluiceResult<String> {
    let bytes = render_to_vec(node, ctx)?;
    // Every chunk writes valid UTF-8 (escaped `str`s, ASCII punctuation).
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
#[path = "../../tests/unit/chunk/render.rs"]
mod tests;
