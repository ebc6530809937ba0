use std::borrow::Cow;
use std::sync::Arc;

use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::tree::attrs::{AttrSet, Attribute};
use crate::tree::node::Node;
use crate::tree::property::{DeferredProperty, Property};

/// HTML elements that never have content or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// `true` for HTML void elements.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// An element under construction.
///
/// Properties are applied eagerly, in argument order, as they are supplied. Deferred properties
/// are only registered here; they run once per render. Once converted into a [`Node`] the element
/// is shared immutably, so one tree can be rendered from several threads at once.
#[derive(Clone, Debug)]
pub struct Element {
    tag: Cow<'static, str>,
    attrs: AttrSet,
    children: Vec<Node>,
    deferred: Vec<DeferredProperty>,
}

impl Element {
    /// Start an element with the given tag name.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            attrs: AttrSet::new(),
            children: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Like [`Element::new`] but rejects tag names that cannot be written safely.
    pub fn try_new(tag: impl Into<Cow<'static, str>>) -> SluiceResult<Self> {
        let tag = tag.into();
        let valid = tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(SluiceError::build(format!("invalid tag name '{tag}'")));
        }
        Ok(Self::new(tag))
    }

    /// Apply one property.
    pub fn with(mut self, prop: impl Into<Property>) -> Self {
        self.apply(prop.into());
        self
    }

    /// Apply several properties in order.
    pub fn with_all<P: Into<Property>>(mut self, props: impl IntoIterator<Item = P>) -> Self {
        for p in props {
            self.apply(p.into());
        }
        self
    }

    fn apply(&mut self, prop: Property) {
        match prop {
            Property::Attr(a) => self.attrs.push(a),
            Property::Class(c) => self.attrs.push_class(c),
            Property::Child(n) => self.children.push(n),
            Property::Deferred(d) => self.deferred.push(d),
            Property::Group(props) => {
                for p in props {
                    self.apply(p);
                }
            }
        }
    }

    /// Add a `key="value"` attribute.
    pub fn attr(self, key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        self.with(Attribute::new(key, value))
    }

    /// Add a bare boolean attribute.
    pub fn bool_attr(self, key: impl Into<Cow<'static, str>>) -> Self {
        self.with(Attribute::bare(key))
    }

    /// Add a deduplicating attribute (last one for `key` wins).
    pub fn unique_attr(
        self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.with(Attribute::new(key, value).deduped())
    }

    /// Append to the class list.
    pub fn class(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.with(Property::Class(name.into()))
    }

    /// Append one child. A deferred-property node becomes a deferred property of this element.
    pub fn child(self, node: impl Into<Node>) -> Self {
        self.with(Property::from(node.into()))
    }

    /// Append several children.
    pub fn children<N: Into<Node>>(mut self, nodes: impl IntoIterator<Item = N>) -> Self {
        for node in nodes {
            self.apply(Property::from(node.into()));
        }
        self
    }

    /// Register a property evaluated at render time.
    pub fn deferred(
        self,
        f: impl Fn(&RenderContext) -> SluiceResult<Property> + Send + Sync + 'static,
    ) -> Self {
        self.with(DeferredProperty::new(f))
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes applied at construction.
    pub fn attrs(&self) -> &AttrSet {
        &self.attrs
    }

    /// Children in declaration order (kept but never written for void tags).
    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    /// Registered deferred properties in registration order.
    pub fn deferred_properties(&self) -> &[DeferredProperty] {
        &self.deferred
    }

    /// `true` when at least one deferred property is registered.
    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// `true` for void tags such as `input` or `br`.
    pub fn is_void(&self) -> bool {
        is_void_tag(&self.tag)
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(Arc::new(el))
    }
}

/// Start an element: `el("div").class("card").child(text("hi"))`.
pub fn el(tag: impl Into<Cow<'static, str>>) -> Element {
    Element::new(tag)
}

#[cfg(test)]
#[path = "../../tests/unit/tree/element.rs"]
mod tests;
