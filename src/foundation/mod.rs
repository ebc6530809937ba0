pub mod context;
pub mod error;
pub(crate) mod escape;
