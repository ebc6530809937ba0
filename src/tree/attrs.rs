use std::borrow::Cow;
use std::io::{self, Write};

use smallvec::SmallVec;

use crate::foundation::escape::write_escaped;

/// Key under which values accumulate into the class list instead of overwriting.
pub const CLASS_KEY: &str = "class";

/// Value half of an [`Attribute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    /// Boolean attribute with no value, rendered as a bare `key` token.
    Bare,
    /// Quoted value, escaped on output.
    Text(Cow<'static, str>),
}

/// A single key/value attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    key: Cow<'static, str>,
    value: AttrValue,
    dedupe: bool,
}

impl Attribute {
    /// Attribute rendered as `key="value"`. Repeats of the same key are all kept.
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: key.into(),
            value: AttrValue::Text(value.into()),
            dedupe: false,
        }
    }

    /// Boolean attribute rendered as a bare `key` token.
    pub fn bare(key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: key.into(),
            value: AttrValue::Bare,
            dedupe: false,
        }
    }

    /// Opt into dedupe semantics: only the last supplied attribute with this key survives.
    pub fn deduped(mut self) -> Self {
        self.dedupe = true;
        self
    }

    /// Attribute key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Attribute value.
    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    /// `true` when this attribute replaces earlier ones with the same key.
    pub fn is_dedupe(&self) -> bool {
        self.dedupe
    }

    fn renders_bare(&self) -> bool {
        match &self.value {
            AttrValue::Bare => true,
            AttrValue::Text(v) => self.dedupe && v.is_empty(),
        }
    }

    /// Write the attribute including its leading space.
    pub(crate) fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(b" ")?;
        out.write_all(self.key.as_bytes())?;
        if self.renders_bare() {
            return Ok(());
        }
        if let AttrValue::Text(v) = &self.value {
            out.write_all(b"=\"")?;
            write_escaped(out, v)?;
            out.write_all(b"\"")?;
        }
        Ok(())
    }
}

/// Per-element attribute accumulator.
///
/// Attributes keep insertion order. `class` values never overwrite: each one appends to the
/// class list, which is joined into a single `class="..."` token only at finalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrSet {
    attrs: SmallVec<[Attribute; 4]>,
    classes: SmallVec<[Cow<'static, str>; 4]>,
}

impl AttrSet {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one attribute following the merge rules.
    ///
    /// A `class` key, in any ASCII case, appends to the class list. A bare `class` carries no
    /// class name and adds nothing.
    pub fn push(&mut self, attr: Attribute) {
        if attr.key.eq_ignore_ascii_case(CLASS_KEY) {
            if let AttrValue::Text(v) = attr.value {
                self.classes.push(v);
            }
            return;
        }

        if attr.dedupe
            && let Some(first) = self.attrs.iter().position(|a| a.key == attr.key)
        {
            // Every earlier occurrence goes; the survivor keeps the first occurrence's slot.
            self.attrs.retain(|a| a.key != attr.key);
            self.attrs.insert(first, attr);
            return;
        }

        self.attrs.push(attr);
    }

    /// Append one entry to the class list.
    pub fn push_class(&mut self, class: impl Into<Cow<'static, str>>) {
        self.classes.push(class.into());
    }

    /// Attributes in render order, excluding the class list.
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Raw class list in application order (duplicates kept).
    pub fn classes(&self) -> &[Cow<'static, str>] {
        &self.classes
    }

    /// `true` when nothing would be rendered.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.class_string().is_none()
    }

    /// Space-joined class list, or `None` when no non-empty class was supplied.
    pub fn class_string(&self) -> Option<String> {
        let mut out = String::new();
        for class in self.classes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(class);
        }
        (!out.is_empty()).then_some(out)
    }

    /// Finalized attribute list: plain attributes followed by the joined class attribute.
    pub fn finalized(&self) -> Vec<Attribute> {
        let mut out: Vec<Attribute> = self.attrs.to_vec();
        if let Some(classes) = self.class_string() {
            out.push(Attribute::new(CLASS_KEY, classes));
        }
        out
    }

    /// Finalize and write every attribute.
    pub(crate) fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for attr in &self.attrs {
            attr.write_to(out)?;
        }
        if let Some(classes) = self.class_string() {
            Attribute::new(CLASS_KEY, classes).write_to(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/attrs.rs"]
mod tests;
