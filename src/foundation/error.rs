/// Convenience result type used across sluice.
pub type SluiceResult<T> = Result<T, SluiceError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum SluiceError {
    /// Malformed tree or property composition, raised before any rendering begins.
    #[error("build error: {0}")]
    Build(String),

    /// A chunk failed while writing output.
    #[error("render error: {0}")]
    Render(String),

    /// A pure chunk failed while building a compiled sequence.
    #[error("compile error: {0}")]
    Compile(String),

    /// Misuse of the response protocol (head set twice, head after commit, ...).
    #[error("response error: {0}")]
    Response(String),

    /// The request context was canceled.
    #[error("render canceled")]
    Canceled,

    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Sink or transport failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from user thunks or dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SluiceError {
    /// Build a [`SluiceError::Build`] value.
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    /// Build a [`SluiceError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`SluiceError::Compile`] value.
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Build a [`SluiceError::Response`] value.
    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }

    /// Build a [`SluiceError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`SluiceError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` when this error means the request went away rather than something failing.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
