//! Dispatchers — route a command to every handler that claims it.
//!
//! Two coordinators share the same contract:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      Dispatcher (trait)                        │
//! │  dispatch(cmd) / dispatch_optional(cmd)                        │
//! └───────────────────────────────────────────────────────────────┘
//!                 │                                 │
//!                 ▼                                 ▼
//! ┌─────────────────────────────┐   ┌─────────────────────────────┐
//! │      SerialDispatcher       │   │     ParallelDispatcher      │
//! │  registration order,        │   │  one thread per handler,    │
//! │  stops at first error       │   │  joins all, ErrorGroup      │
//! └─────────────────────────────┘   └─────────────────────────────┘
//!                 │                                 │
//!                 └──────────────┬──────────────────┘
//!                                ▼
//!                 ┌─────────────────────────────┐
//!                 │  HandlerRegistry (RwLock)   │
//!                 └─────────────────────────────┘
//! ```
//!
//! Panics inside `can_handle` or `handle` never escape a dispatch call:
//! they are caught at the call site and reported as that handler's error.

mod parallel;
mod registry;
mod serial;

pub use parallel::{ParallelConfig, ParallelDispatcher};
pub use registry::HandlerRegistry;
pub use serial::SerialDispatcher;

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::command::Command;
use crate::error::{DispatchError, HandlerError};
use crate::handler::Handler;

/// Routes commands to registered handlers.
///
/// Object safe: handlers receive `&dyn Dispatcher` so they can dispatch
/// follow-up commands through whichever coordinator is running them.
pub trait Dispatcher: Send + Sync {
    /// Dispatch a command to every handler that claims it.
    fn dispatch(&self, command: Command) -> Result<(), DispatchError>;

    /// Like `dispatch`, but a command nobody handles is not an error.
    fn dispatch_optional(&self, command: Command) -> Result<(), DispatchError> {
        match self.dispatch(command) {
            Err(DispatchError::NoHandlerFound(_)) => Ok(()),
            other => other,
        }
    }
}

/// Run one handler call, turning a panic into that handler's error.
pub(crate) fn guarded<T>(handler: &dyn Handler, f: impl FnOnce() -> T) -> Result<T, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let err = HandlerError::from_panic(handler.name(), payload);
        warn!(handler = handler.name(), error = %err, "handler panicked");
        err
    })
}

/// Evaluate a handler against a command: `None` if it did not claim it,
/// otherwise the result of its action.
pub(crate) fn run_handler(
    handler: &dyn Handler,
    command: &Command,
    dispatcher: &dyn Dispatcher,
) -> Option<Result<(), HandlerError>> {
    match guarded(handler, || handler.can_handle(command)) {
        Ok(false) => None,
        Ok(true) => Some(guarded(handler, || handler.handle(command, dispatcher)).and_then(|r| r)),
        Err(err) => Some(Err(err)),
    }
}
