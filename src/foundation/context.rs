use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

type ValueMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Render-time context handed to impure chunks, components, deferred properties and slot
/// producers.
///
/// Cloning is cheap. Values are copy-on-write: [`RenderContext::with_value`] returns a new
/// context and leaves the original untouched. The cancellation token is the single source of
/// cancellation for a request.
#[derive(Clone)]
pub struct RenderContext {
    cancel: CancellationToken,
    background: bool,
    values: Arc<ValueMap>,
}

impl RenderContext {
    /// Fresh request context with its own cancellation token and no values.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            background: false,
            values: Arc::new(HashMap::new()),
        }
    }

    /// Neutral context used when no request is in flight (static compilation).
    ///
    /// A background context is never canceled by anyone holding a request handle.
    pub fn background() -> Self {
        Self {
            background: true,
            ..Self::new()
        }
    }

    /// Request context bound to an existing token (e.g. a server shutdown token).
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            background: false,
            values: Arc::new(HashMap::new()),
        }
    }

    /// Return a copy of this context carrying `value`, replacing any previous value of the same
    /// type.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            cancel: self.cancel.clone(),
            background: self.background,
            values: Arc::new(values),
        }
    }

    /// Look up a value by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Derive a context sharing this one's values whose token is a child of this one's token.
    ///
    /// Canceling the parent cancels the child; canceling the child leaves the parent alone.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            background: self.background,
            values: Arc::clone(&self.values),
        }
    }

    /// `true` for contexts created with [`RenderContext::background`].
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Cancel this context and every context derived from it with [`RenderContext::child`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once the context has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve once the context is canceled.
    pub async fn canceled(&self) {
        self.cancel.cancelled().await;
    }

    /// The underlying token, for integration with other tokio-util aware code.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("background", &self.background)
            .field("canceled", &self.is_canceled())
            .field("values", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/context.rs"]
mod tests;
