use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::element::Element;
use crate::tree::property::{DeferredProperty, Property};

type ComponentFn = dyn Fn(&RenderContext) -> SluiceResult<Node> + Send + Sync;
type FallbackFn = dyn Fn(&SluiceError) -> Node + Send + Sync;

/// Renderable content.
///
/// A closed sum type: every consumer matches exhaustively. Nodes are immutable after
/// construction and cheap to clone (shared parts live behind `Arc`), so one tree may be
/// rendered concurrently.
#[derive(Clone)]
pub enum Node {
    /// Text, HTML-escaped on output.
    Text(Cow<'static, str>),
    /// Markup written verbatim.
    Raw(Cow<'static, str>),
    /// Children rendered back to back with no wrapper.
    Fragment(Arc<[Node]>),
    /// An element with attributes and children.
    Element(Arc<Element>),
    /// A subtree built at render time from the live context.
    Component(Component),
    /// A property evaluated at render time; only meaningful as an element child.
    Deferred(DeferredProperty),
    /// Renders its wrapped node, or a fallback when that fails.
    Boundary(Arc<Boundary>),
}

impl Node {
    /// A node that renders nothing.
    pub fn empty() -> Self {
        Node::Fragment(Arc::from(Vec::new()))
    }

    /// Short variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Raw(_) => "raw",
            Node::Fragment(_) => "fragment",
            Node::Element(_) => "element",
            Node::Component(_) => "component",
            Node::Deferred(_) => "deferred property",
            Node::Boundary(_) => "boundary",
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Node::Raw(t) => f.debug_tuple("Raw").field(t).finish(),
            Node::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Node::Element(el) => f.debug_tuple("Element").field(el).finish(),
            Node::Component(_) => f.write_str("Component(..)"),
            Node::Deferred(_) => f.write_str("Deferred(..)"),
            Node::Boundary(b) => f.debug_tuple("Boundary").field(&b.node).finish(),
        }
    }
}

impl From<&'static str> for Node {
    fn from(s: &'static str) -> Self {
        Node::Text(Cow::Borrowed(s))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(Cow::Owned(s))
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(Arc::from(nodes))
    }
}

impl From<Option<Node>> for Node {
    fn from(node: Option<Node>) -> Self {
        node.unwrap_or_else(Node::empty)
    }
}

/// A thunk from render context to node.
#[derive(Clone)]
pub struct Component(Arc<ComponentFn>);

impl Component {
    /// Wrap a render-time tree builder.
    pub fn new(f: impl Fn(&RenderContext) -> SluiceResult<Node> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn expand(&self, ctx: &RenderContext) -> SluiceResult<Node> {
        (self.0)(ctx)
    }
}

/// Error boundary: a node plus the fallback to render if it fails.
pub struct Boundary {
    pub(crate) node: Node,
    fallback: Box<FallbackFn>,
}

impl Boundary {
    pub(crate) fn fallback_for(&self, err: &SluiceError) -> Node {
        (self.fallback)(err)
    }
}

/// Escaped text node.
pub fn text(s: impl Into<Cow<'static, str>>) -> Node {
    Node::Text(s.into())
}

/// Verbatim markup. The caller is responsible for its well-formedness.
pub fn raw(s: impl Into<Cow<'static, str>>) -> Node {
    Node::Raw(s.into())
}

/// `<!doctype html>`.
pub fn doctype() -> Node {
    raw("<!doctype html>")
}

/// Group several nodes without a wrapper element.
pub fn fragment<N: Into<Node>>(nodes: impl IntoIterator<Item = N>) -> Node {
    Node::Fragment(nodes.into_iter().map(Into::into).collect())
}

/// Node built at render time, e.g. a localized string looked up from the context.
pub fn component(
    f: impl Fn(&RenderContext) -> SluiceResult<Node> + Send + Sync + 'static,
) -> Node {
    Node::Component(Component::new(f))
}

/// Deferred property usable as an element child.
pub fn deferred(
    f: impl Fn(&RenderContext) -> SluiceResult<Property> + Send + Sync + 'static,
) -> Node {
    Node::Deferred(DeferredProperty::new(f))
}

/// Render `node`, or `fallback(err)` in its place if rendering it fails.
///
/// The wrapped node is rendered into a scratch buffer first, so a failure never leaves half of
/// it in the output.
pub fn boundary(
    node: impl Into<Node>,
    fallback: impl Fn(&SluiceError) -> Node + Send + Sync + 'static,
) -> Node {
    Node::Boundary(Arc::new(Boundary {
        node: node.into(),
        fallback: Box::new(fallback),
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/tree/node.rs"]
mod tests;
