//! Handler contract and closure-backed handlers.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::command::Command;
use crate::dispatcher::Dispatcher;
use crate::error::HandlerError;

/// A command handler.
///
/// `can_handle` decides whether this handler claims a command; `handle`
/// does the work and is only called when `can_handle` returned `true`.
/// Both may panic: dispatchers catch the panic and report it as this
/// handler's error.
///
/// Handlers are registered as `Arc<dyn Handler>`, and the `Arc` is the
/// handler's identity: registering the same `Arc` twice keeps one entry.
pub trait Handler: Send + Sync {
    fn can_handle(&self, command: &Command) -> bool;

    /// `dispatcher` is the dispatcher running this handler, so a handler
    /// can dispatch follow-up commands through it.
    fn handle(&self, command: &Command, dispatcher: &dyn Dispatcher) -> Result<(), HandlerError>;

    /// Name used in log records and panic attribution.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A handler built from a predicate closure and an action closure.
pub struct FnHandler<C, A> {
    name: String,
    can_handle: C,
    act: A,
}

impl<C, A> FnHandler<C, A> {
    /// Rename the handler (defaults to `"fn_handler"`).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<C, A> Handler for FnHandler<C, A>
where
    C: Fn(&Command) -> bool + Send + Sync,
    A: Fn(&Command, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync,
{
    fn can_handle(&self, command: &Command) -> bool {
        (self.can_handle)(command)
    }

    fn handle(&self, command: &Command, dispatcher: &dyn Dispatcher) -> Result<(), HandlerError> {
        (self.act)(command, dispatcher)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a handler from two closures.
///
/// ```
/// use sourced_dispatch::{handler_fn, Command, Dispatcher, SerialDispatcher};
///
/// let audit = handler_fn(|_cmd| true, |cmd, _dispatcher| {
///     println!("saw {}", cmd.type_name());
///     Ok(())
/// });
///
/// let dispatcher = SerialDispatcher::new(vec![audit.into_handler()]);
/// dispatcher.dispatch(Command::new(1u32)).unwrap();
/// ```
pub fn handler_fn<C, A>(can_handle: C, act: A) -> FnHandler<C, A>
where
    C: Fn(&Command) -> bool + Send + Sync + 'static,
    A: Fn(&Command, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    FnHandler {
        name: "fn_handler".to_string(),
        can_handle,
        act,
    }
}

impl<C, A> FnHandler<C, A>
where
    C: Fn(&Command) -> bool + Send + Sync + 'static,
    A: Fn(&Command, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    /// Box the handler for registration.
    pub fn into_handler(self) -> Arc<dyn Handler> {
        Arc::new(self)
    }
}

/// A handler that claims every command whose concrete type is `T`.
pub struct TypedHandler<T, A> {
    act: A,
    _command: PhantomData<fn(&T)>,
}

impl<T, A> Handler for TypedHandler<T, A>
where
    T: Any + Send + Sync,
    A: Fn(&T, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync,
{
    fn can_handle(&self, command: &Command) -> bool {
        command.is::<T>()
    }

    fn handle(&self, command: &Command, dispatcher: &dyn Dispatcher) -> Result<(), HandlerError> {
        match command.downcast_ref::<T>() {
            Some(typed) => (self.act)(typed, dispatcher),
            None => Err(HandlerError::Failed(format!(
                "expected command of type {}, got {}",
                std::any::type_name::<T>(),
                command.type_name()
            ))),
        }
    }

    fn name(&self) -> &str {
        std::any::type_name::<T>()
    }
}

/// Build a handler for commands of type `T`.
///
/// ```
/// use sourced_dispatch::{on, Command, Dispatcher, SerialDispatcher};
///
/// struct Ping;
///
/// let dispatcher = SerialDispatcher::new(vec![on::<Ping, _>(|_ping, _d| Ok(()))]);
/// assert!(dispatcher.dispatch(Command::new(Ping)).is_ok());
/// assert!(dispatcher.dispatch(Command::new("not a ping")).is_err());
/// ```
pub fn on<T, A>(act: A) -> Arc<dyn Handler>
where
    T: Any + Send + Sync,
    A: Fn(&T, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(TypedHandler {
        act,
        _command: PhantomData,
    })
}
