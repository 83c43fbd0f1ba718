//! Error types for command dispatch.
//!
//! A dispatch call reports one of three outcomes besides success:
//!
//! - [`NoHandlerFoundError`]: no registered handler matched the command.
//!   `dispatch_optional` absorbs exactly this case.
//! - A bare [`HandlerError`]: the first failure of a serial dispatch.
//! - An [`ErrorGroup`]: every failure of a parallel dispatch, even when
//!   only one handler failed.
//!
//! All three are carried by [`DispatchError`] so callers can match on the
//! kind they care about.

use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::command::Command;

/// Error produced by a handler, either returned from its action or
/// converted from a panic inside `can_handle`/`handle`.
#[derive(Debug)]
pub enum HandlerError {
    /// Business logic rejected the command.
    Rejected(String),
    /// The handler could not complete its work (decode failure, I/O, ...).
    Failed(String),
    /// The handler panicked with a payload that was not an error value.
    Panicked { handler: String, message: String },
    /// A command re-dispatched from inside the handler failed.
    Dispatch(Box<DispatchError>),
    /// Any other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        HandlerError::Rejected(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        HandlerError::Other(Box::new(err))
    }

    /// Convert a caught panic payload into a handler error.
    ///
    /// Payloads that already are errors (`HandlerError`, `DispatchError`,
    /// or a boxed `Error`) are passed through. Anything else becomes
    /// `Panicked`, attributed to `handler`.
    pub fn from_panic(handler: &str, payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<HandlerError>() {
            Ok(err) => return *err,
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<DispatchError>() {
            Ok(err) => return HandlerError::Dispatch(err),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<Box<dyn Error + Send + Sync>>() {
            Ok(err) => return HandlerError::Other(*err),
            Err(payload) => payload,
        };

        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        HandlerError::Panicked {
            handler: handler.to_string(),
            message,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Rejected(msg) => write!(f, "rejected: {}", msg),
            HandlerError::Failed(msg) => write!(f, "failed: {}", msg),
            HandlerError::Panicked { handler, message } => {
                write!(f, "handler {} panicked: {}", handler, message)
            }
            HandlerError::Dispatch(e) => write!(f, "nested dispatch failed: {}", e),
            HandlerError::Other(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Dispatch(e) => Some(e.as_ref()),
            HandlerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<DispatchError> for HandlerError {
    fn from(err: DispatchError) -> Self {
        HandlerError::Dispatch(Box::new(err))
    }
}

impl From<Box<dyn Error + Send + Sync>> for HandlerError {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        HandlerError::Other(err)
    }
}

#[cfg(feature = "bus")]
impl From<bitcode::Error> for HandlerError {
    fn from(err: bitcode::Error) -> Self {
        HandlerError::Failed(format!("decode failed: {}", err))
    }
}

#[cfg(feature = "bus")]
impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Failed(format!("decode failed: {}", err))
    }
}

/// No registered handler matched the command.
#[derive(Debug, Clone)]
pub struct NoHandlerFoundError {
    /// The command nobody claimed.
    pub command: Command,
}

impl fmt::Display for NoHandlerFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no handler can handle command of type {}",
            self.command.type_name()
        )
    }
}

impl Error for NoHandlerFoundError {}

/// The errors collected from every failing handler of one parallel dispatch.
#[derive(Debug)]
pub struct ErrorGroup {
    errors: Vec<HandlerError>,
}

impl ErrorGroup {
    pub fn new(errors: Vec<HandlerError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[HandlerError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HandlerError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_inner(self) -> Vec<HandlerError> {
        self.errors
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl Error for ErrorGroup {}

impl IntoIterator for ErrorGroup {
    type Item = HandlerError;
    type IntoIter = std::vec::IntoIter<HandlerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorGroup {
    type Item = &'a HandlerError;
    type IntoIter = std::slice::Iter<'a, HandlerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Outcome of a failed dispatch call.
#[derive(Debug)]
pub enum DispatchError {
    /// No handler matched the command.
    NoHandlerFound(NoHandlerFoundError),
    /// A handler failed (serial dispatch stops at the first one).
    Handler(HandlerError),
    /// One or more handlers failed during a parallel dispatch.
    Group(ErrorGroup),
    /// The handler registry lock was poisoned by a panicking writer.
    RegistryPoisoned,
}

impl DispatchError {
    pub fn no_handler_found(command: Command) -> Self {
        DispatchError::NoHandlerFound(NoHandlerFoundError { command })
    }

    pub fn is_no_handler_found(&self) -> bool {
        matches!(self, DispatchError::NoHandlerFound(_))
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoHandlerFound(e) => write!(f, "{}", e),
            DispatchError::Handler(e) => write!(f, "{}", e),
            DispatchError::Group(e) => write!(f, "{}", e),
            DispatchError::RegistryPoisoned => write!(f, "handler registry lock poisoned"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::NoHandlerFound(e) => Some(e),
            DispatchError::Handler(e) => Some(e),
            DispatchError::Group(e) => Some(e),
            DispatchError::RegistryPoisoned => None,
        }
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}

impl From<ErrorGroup> for DispatchError {
    fn from(group: ErrorGroup) -> Self {
        DispatchError::Group(group)
    }
}
