//! Shared, append-only handler registry.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use crate::error::DispatchError;
use crate::handler::Handler;

/// Ordered set of handlers shared by every dispatch on one dispatcher.
///
/// Appends take the write lock; dispatches take the read lock just long
/// enough to clone the `Arc`s into a snapshot, so handlers never run while
/// the lock is held and an append during an in-flight dispatch only affects
/// later calls.
pub struct HandlerRegistry {
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    /// Create a registry from an initial handler list, dropping duplicates.
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        let mut unique: Vec<Arc<dyn Handler>> = Vec::with_capacity(handlers.len());
        for handler in handlers {
            if !unique.iter().any(|existing| same_handler(existing, &handler)) {
                unique.push(handler);
            }
        }
        Self {
            handlers: RwLock::new(unique),
        }
    }

    /// Append handlers not already registered. Returns how many were added.
    pub fn append<I>(&self, handlers: I) -> Result<usize, DispatchError>
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        let mut registered = self
            .handlers
            .write()
            .map_err(|_| DispatchError::RegistryPoisoned)?;

        let mut added = 0;
        for handler in handlers {
            if registered.iter().any(|existing| same_handler(existing, &handler)) {
                debug!(handler = handler.name(), "handler already registered, skipping");
                continue;
            }
            debug!(handler = handler.name(), "handler registered");
            registered.push(handler);
            added += 1;
        }
        Ok(added)
    }

    /// Clone the current handler list.
    pub fn snapshot(&self) -> Result<Vec<Arc<dyn Handler>>, DispatchError> {
        let registered = self
            .handlers
            .read()
            .map_err(|_| DispatchError::RegistryPoisoned)?;
        Ok(registered.clone())
    }

    pub fn contains(&self, handler: &Arc<dyn Handler>) -> bool {
        self.read()
            .iter()
            .any(|existing| same_handler(existing, handler))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Read-only accessors look through poisoning: a writer can only panic
    // inside `append`, after which the list holds whole entries.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn Handler>>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// Compare data pointers only; vtable pointers for one type may differ
// between codegen units.
fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
