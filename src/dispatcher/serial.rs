//! Sequential, fail-fast dispatcher.

use std::sync::Arc;

use tracing::{debug, trace};

use super::registry::HandlerRegistry;
use super::{run_handler, Dispatcher};
use crate::command::Command;
use crate::error::DispatchError;
use crate::handler::Handler;

/// Dispatches on the calling thread, in registration order.
///
/// Every handler's `can_handle` is evaluated in turn; each handler that
/// claims the command is run before the next one is evaluated. The first
/// handler error stops the dispatch and is returned as
/// `DispatchError::Handler`; later handlers are not evaluated at all.
///
/// ## Example
///
/// ```
/// use sourced_dispatch::{on, Command, Dispatcher, DispatchError, HandlerError, SerialDispatcher};
///
/// struct Withdraw(u64);
///
/// let dispatcher = SerialDispatcher::new(vec![on::<Withdraw, _>(|w, _d| {
///     if w.0 > 100 {
///         return Err(HandlerError::rejected("insufficient funds"));
///     }
///     Ok(())
/// })]);
///
/// assert!(dispatcher.dispatch(Command::new(Withdraw(10))).is_ok());
/// assert!(matches!(
///     dispatcher.dispatch(Command::new(Withdraw(500))),
///     Err(DispatchError::Handler(HandlerError::Rejected(_)))
/// ));
/// assert!(dispatcher.dispatch(Command::new("unknown")).unwrap_err().is_no_handler_found());
/// assert!(dispatcher.dispatch_optional(Command::new("unknown")).is_ok());
/// ```
pub struct SerialDispatcher {
    registry: HandlerRegistry,
}

impl SerialDispatcher {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self {
            registry: HandlerRegistry::new(handlers),
        }
    }

    /// Register more handlers, skipping any already registered.
    /// Returns how many were added.
    pub fn append_handlers<I>(&self, handlers: I) -> Result<usize, DispatchError>
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        self.registry.append(handlers)
    }

    /// Snapshot of the registered handlers, in registration order.
    pub fn handlers(&self) -> Result<Vec<Arc<dyn Handler>>, DispatchError> {
        self.registry.snapshot()
    }
}

impl Dispatcher for SerialDispatcher {
    fn dispatch(&self, command: Command) -> Result<(), DispatchError> {
        let handlers = self.registry.snapshot()?;
        debug!(
            command = command.type_name(),
            handlers = handlers.len(),
            "serial dispatch"
        );

        let mut found = false;
        for handler in &handlers {
            trace!(handler = handler.name(), "evaluating handler");
            match run_handler(handler.as_ref(), &command, self) {
                None => continue,
                Some(Ok(())) => found = true,
                Some(Err(err)) => return Err(DispatchError::Handler(err)),
            }
        }

        if !found {
            debug!(command = command.type_name(), "no handler found");
            return Err(DispatchError::no_handler_found(command));
        }
        Ok(())
    }
}
