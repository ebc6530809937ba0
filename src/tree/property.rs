use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::attrs::{AttrSet, Attribute};
use crate::tree::element::Element;
use crate::tree::node::Node;

type DeferredFn = dyn Fn(&RenderContext) -> SluiceResult<Property> + Send + Sync;

/// A property whose value is only known at render time.
///
/// Evaluated exactly once per render of the owning element, after the element's `<tag` has been
/// written and before its attribute string is finalized.
#[derive(Clone)]
pub struct DeferredProperty(Arc<DeferredFn>);

impl DeferredProperty {
    /// Wrap a context-to-property function.
    pub fn new(
        f: impl Fn(&RenderContext) -> SluiceResult<Property> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn resolve(&self, ctx: &RenderContext) -> SluiceResult<Property> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for DeferredProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredProperty(..)")
    }
}

/// Anything that can be applied to an [`Element`] under construction.
#[derive(Clone, Debug)]
pub enum Property {
    /// One attribute; `class` keys accumulate into the class list.
    Attr(Attribute),
    /// One class list entry.
    Class(Cow<'static, str>),
    /// One child node.
    Child(Node),
    /// A property resolved at render time.
    Deferred(DeferredProperty),
    /// Several properties applied in order.
    Group(Vec<Property>),
}

impl From<Attribute> for Property {
    fn from(attr: Attribute) -> Self {
        Self::Attr(attr)
    }
}

impl From<Node> for Property {
    fn from(node: Node) -> Self {
        match node {
            Node::Deferred(d) => Self::Deferred(d),
            other => Self::Child(other),
        }
    }
}

impl From<Element> for Property {
    fn from(el: Element) -> Self {
        Self::Child(el.into())
    }
}

impl From<DeferredProperty> for Property {
    fn from(d: DeferredProperty) -> Self {
        Self::Deferred(d)
    }
}

impl From<&'static str> for Property {
    fn from(s: &'static str) -> Self {
        Self::Child(Node::Text(Cow::Borrowed(s)))
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Self::Child(Node::Text(Cow::Owned(s)))
    }
}

impl From<Vec<Property>> for Property {
    fn from(props: Vec<Property>) -> Self {
        Self::Group(props)
    }
}

/// `key="value"` attribute; repeats are kept.
pub fn attr(key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Property {
    Property::Attr(Attribute::new(key, value))
}

/// Bare boolean attribute.
pub fn bool_attr(key: impl Into<Cow<'static, str>>) -> Property {
    Property::Attr(Attribute::bare(key))
}

/// Deduplicating attribute: the last one supplied for `key` wins.
pub fn unique_attr(
    key: impl Into<Cow<'static, str>>,
    value: impl Into<Cow<'static, str>>,
) -> Property {
    Property::Attr(Attribute::new(key, value).deduped())
}

/// Class list entry.
pub fn class(name: impl Into<Cow<'static, str>>) -> Property {
    Property::Class(name.into())
}

/// Apply a property produced by a deferred property to a render-local attribute set.
///
/// Nested deferred properties resolve immediately against the same context. Children cannot be
/// added this late: the element's child chunks are already laid out.
pub(crate) fn apply_resolved(
    attrs: &mut AttrSet,
    prop: Property,
    ctx: &RenderContext,
) -> SluiceResult<()> {
    match prop {
        Property::Attr(a) => attrs.push(a),
        Property::Class(c) => attrs.push_class(c),
        Property::Group(props) => {
            for p in props {
                apply_resolved(attrs, p, ctx)?;
            }
        }
        Property::Deferred(d) => apply_resolved(attrs, d.resolve(ctx)?, ctx)?,
        Property::Child(_) => {
            return Err(SluiceError::render(
                "deferred property tried to add a child node",
            ));
        }
    }
    Ok(())
}

/// Apply `props` to the single element among `children`.
///
/// Used by wrappers that decorate exactly one caller-supplied element (tooltips, triggers).
/// Whitespace-only text is ignored when counting; anything else counts as a child. Zero or
/// several children, or a single child that is not an element, is a construction error.
pub fn apply_to_child(
    children: impl IntoIterator<Item = Node>,
    props: impl IntoIterator<Item = Property>,
) -> SluiceResult<Node> {
    let mut found: Vec<Node> = children
        .into_iter()
        .filter(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()))
        .collect();

    if found.len() != 1 {
        return Err(SluiceError::build(format!(
            "expected exactly one child to receive properties, found {}",
            found.len()
        )));
    }

    match found.pop() {
        Some(Node::Element(el)) => {
            let el = Arc::unwrap_or_clone(el).with_all(props);
            Ok(el.into())
        }
        Some(other) => Err(SluiceError::build(format!(
            "properties can only be applied to an element, found {}",
            other.kind()
        ))),
        None => Err(SluiceError::build("no child to receive properties")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/property.rs"]
mod tests;
