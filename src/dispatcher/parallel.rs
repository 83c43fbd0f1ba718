//! Concurrent, join-all dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, trace};

use super::registry::HandlerRegistry;
use super::{run_handler, Dispatcher};
use crate::command::Command;
use crate::error::{DispatchError, ErrorGroup, HandlerError};
use crate::handler::Handler;

/// Settings for the worker threads spawned by a [`ParallelDispatcher`].
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Prefix for worker thread names; the handler's index is appended.
    pub thread_name: String,
    /// Worker stack size in bytes. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            thread_name: "dispatch-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ParallelConfig {
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    fn builder(&self, index: usize) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-{}", self.thread_name, index));
        match self.stack_size {
            Some(bytes) => builder.stack_size(bytes),
            None => builder,
        }
    }
}

/// One unit's report: the handler's registration index, and `None` if it
/// did not claim the command.
type Report = (usize, Option<Result<(), HandlerError>>);

/// Dispatches to every handler at once, one thread per handler.
///
/// Each handler's `can_handle` runs on its own thread, so a slow predicate
/// never delays the others. All threads are joined before `dispatch`
/// returns, and a failing handler never stops its siblings. Every failure
/// is collected into an [`ErrorGroup`] (ordered by registration), which is
/// returned even when only one handler failed.
///
/// There is no timeout or cancellation: a dispatch takes as long as its
/// slowest handler.
///
/// ## Example
///
/// ```
/// use sourced_dispatch::{handler_fn, Command, Dispatcher, DispatchError, HandlerError, ParallelDispatcher};
///
/// let audit = handler_fn(|_| true, |_, _| Err(HandlerError::failed("audit log full"))).into_handler();
/// let notify = handler_fn(|_| true, |_, _| Ok(())).into_handler();
///
/// let dispatcher = ParallelDispatcher::new(vec![audit, notify]);
/// match dispatcher.dispatch(Command::new("order.created")) {
///     Err(DispatchError::Group(group)) => assert_eq!(group.len(), 1),
///     other => panic!("expected a group, got {:?}", other),
/// }
/// ```
pub struct ParallelDispatcher {
    registry: HandlerRegistry,
    config: ParallelConfig,
}

impl ParallelDispatcher {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self::with_config(handlers, ParallelConfig::default())
    }

    pub fn with_config(handlers: Vec<Arc<dyn Handler>>, config: ParallelConfig) -> Self {
        Self {
            registry: HandlerRegistry::new(handlers),
            config,
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

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    fn evaluate(
        &self,
        index: usize,
        handler: &dyn Handler,
        command: &Command,
        matched: &AtomicBool,
    ) -> Report {
        trace!(handler = handler.name(), index, "evaluating handler");
        let outcome = run_handler(handler, command, self);
        if outcome.is_some() {
            matched.store(true, Ordering::Release);
        }
        (index, outcome)
    }
}

impl Dispatcher for ParallelDispatcher {
    fn dispatch(&self, command: Command) -> Result<(), DispatchError> {
        let handlers = self.registry.snapshot()?;
        debug!(
            command = command.type_name(),
            handlers = handlers.len(),
            "parallel dispatch"
        );

        let matched = AtomicBool::new(false);
        // One slot per unit: no unit ever blocks on send.
        let (tx, rx) = mpsc::sync_channel::<Report>(handlers.len());

        thread::scope(|scope| {
            for (index, handler) in handlers.iter().enumerate() {
                let unit_tx = tx.clone();
                let command = &command;
                let matched = &matched;
                let spawned = self.config.builder(index).spawn_scoped(scope, move || {
                    let report = self.evaluate(index, handler.as_ref(), command, matched);
                    let _ = unit_tx.send(report);
                });

                if let Err(err) = spawned {
                    error!(
                        handler = handler.name(),
                        error = %err,
                        "failed to spawn dispatch worker, running inline"
                    );
                    let report = self.evaluate(index, handler.as_ref(), command, matched);
                    let _ = tx.send(report);
                }
            }
        });
        drop(tx);

        if !matched.load(Ordering::Acquire) {
            debug!(command = command.type_name(), "no handler found");
            return Err(DispatchError::no_handler_found(command));
        }

        let mut failures: Vec<(usize, HandlerError)> = rx
            .iter()
            .filter_map(|(index, outcome)| match outcome {
                Some(Err(err)) => Some((index, err)),
                _ => None,
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort_by_key(|(index, _)| *index);
        debug!(failures = failures.len(), "parallel dispatch failed");
        Err(DispatchError::Group(ErrorGroup::new(
            failures.into_iter().map(|(_, err)| err).collect(),
        )))
    }
}
