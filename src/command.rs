//! Type-erased command values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque command routed through a dispatcher.
///
/// Wraps any `Send + Sync` value behind an `Arc`, so cloning a `Command`
/// is cheap and the same value can be shared by every handler evaluated
/// during a dispatch (including handlers running on other threads).
/// Dispatchers never look inside; handlers inspect it with `is` or
/// `downcast_ref`.
///
/// ## Example
///
/// ```
/// use sourced_dispatch::Command;
///
/// struct CreateOrder { id: String }
///
/// let cmd = Command::new(CreateOrder { id: "o1".into() });
/// assert!(cmd.is::<CreateOrder>());
/// assert_eq!(cmd.downcast_ref::<CreateOrder>().unwrap().id, "o1");
/// assert!(cmd.downcast_ref::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Command {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Command {
    /// Wrap a value as a command.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns `true` if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the wrapped value as a `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Name of the wrapped value's concrete type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.type_name).finish()
    }
}
