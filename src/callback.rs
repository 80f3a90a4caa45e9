//! Callback manager surface the host runtime dispatches through.
//!
//! The host constructs a `CallbackManager` per execution scope and fans
//! lifecycle events out to its registered handlers. Managers built for
//! nested scopes inherit the parent manager's handler list, which is why
//! attachment must be guarded (see [`crate::instrument::ensure_attached`]).
//!
//! Handler identity is an explicit [`HandlerTag`] compared by value; a
//! manager never needs to inspect a handler's concrete type to know
//! whether one of its kind is already registered.

use crate::run::LifecycleEvent;
use std::fmt;
use std::sync::Arc;

/// Identity discriminator for a handler type.
///
/// Two handlers with equal tags are treated as the same kind of handler
/// no matter which instances they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerTag(&'static str);

impl HandlerTag {
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HandlerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A recipient of lifecycle events dispatched by a [`CallbackManager`].
///
/// Handlers must tolerate concurrent delivery; the manager adds no locking
/// of its own around `handle_event`.
pub trait CallbackHandler: Send + Sync {
    /// The identity tag of this handler's type
    fn tag(&self) -> HandlerTag;

    /// Receive one lifecycle event.
    ///
    /// Must not panic into the host call path; handlers contain their own
    /// failures.
    fn handle_event(&self, event: &LifecycleEvent);
}

/// Dispatches lifecycle events to an ordered list of inheritable handlers.
///
/// # Examples
///
/// ```
/// use tracelink::callback::CallbackManager;
///
/// let manager = CallbackManager::new();
/// assert!(manager.inheritable_handlers().is_empty());
/// ```
pub struct CallbackManager {
    inheritable_handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl CallbackManager {
    /// Create a manager with no handlers
    pub fn new() -> Self {
        Self {
            inheritable_handlers: Vec::new(),
        }
    }

    /// Register a handler that child managers will inherit
    pub fn add_inheritable_handler(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.inheritable_handlers.push(handler);
    }

    /// Whether any registered handler carries the given tag
    pub fn has_handler(&self, tag: HandlerTag) -> bool {
        self.inheritable_handlers.iter().any(|h| h.tag() == tag)
    }

    /// The registered handlers, in registration order
    pub fn inheritable_handlers(&self) -> &[Arc<dyn CallbackHandler>] {
        &self.inheritable_handlers
    }

    /// Deliver an event to every handler in registration order
    pub fn dispatch(&self, event: &LifecycleEvent) {
        for handler in &self.inheritable_handlers {
            handler.handle_event(event);
        }
    }

    /// Build a manager for a nested scope, inheriting this manager's
    /// handler list
    pub fn child(&self) -> Self {
        Self {
            inheritable_handlers: self.inheritable_handlers.clone(),
        }
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}
