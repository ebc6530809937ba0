//! Node tree model: nodes, elements, attributes and properties.

/// Ordered attribute accumulation.
pub mod attrs;
/// Element builder and tag tables.
pub mod element;
/// The node sum type and its constructors.
pub mod node;
/// Element properties, including deferred ones.
pub mod property;
