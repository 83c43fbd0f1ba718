//! Background thread that feeds queued messages into a dispatcher.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender as StopSender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::{Listener, Message};
use crate::command::Command;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Statistics from a listener thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListenerStats {
    /// Messages dispatched without error.
    pub handled: usize,
    /// Messages whose dispatch failed.
    pub failed: usize,
    /// Messages no handler claimed.
    pub unhandled: usize,
    /// `listen` calls that returned an error.
    pub errors: usize,
    /// Number of poll cycles completed.
    pub polls: usize,
}

impl ListenerStats {
    fn record(&mut self, queue: &str, id: &str, outcome: Result<(), DispatchError>) {
        match outcome {
            Ok(()) => self.handled += 1,
            Err(DispatchError::NoHandlerFound(_)) => {
                debug!(queue, message = id, "no handler for message");
                self.unhandled += 1;
            }
            Err(err) => {
                warn!(queue, message = id, error = %err, "message dispatch failed");
                self.failed += 1;
            }
        }
    }
}

/// Handle to a background listener thread. Drop or call `stop()` to shut down.
pub struct ListenerHandle {
    stop_tx: StopSender<()>,
    handle: Option<JoinHandle<ListenerStats>>,
}

impl ListenerHandle {
    /// Stop the listener and wait for it to finish. Returns stats.
    pub fn stop(mut self) -> ListenerStats {
        self.signal_stop();
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Blocks for up to `wait`; returns `true` once a stop was requested or
/// the handle is gone.
fn stop_requested(stop_rx: &Receiver<()>, wait: Option<Duration>) -> bool {
    match wait {
        None => !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)),
        Some(wait) => !matches!(stop_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout)),
    }
}

/// Listen on a named queue and dispatch every message as a [`Command`].
///
/// Spawns a background thread that takes messages from `listener` one at
/// a time and hands each to `dispatcher`. The message stays a
/// [`Message`] inside the command, so handlers built with
/// [`super::on_message`] pick it up by type. A failing `listen` call is
/// counted and retried after `poll_interval`.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sourced_dispatch::bus::{self, InMemoryQueue, Message, Sender};
/// use sourced_dispatch::SerialDispatcher;
///
/// let dispatcher = Arc::new(SerialDispatcher::new(vec![
///     bus::on_message("ping", |_msg, _d| Ok(())),
/// ]));
///
/// let queue = InMemoryQueue::new();
/// let handle = bus::listen(dispatcher, "pings", queue.clone(), Duration::from_millis(10));
///
/// queue.send("pings", Message::with_string_payload("m-1", "ping", "")).unwrap();
/// while !queue.is_empty("pings") {
///     std::thread::sleep(Duration::from_millis(5));
/// }
///
/// let stats = handle.stop();
/// assert_eq!(stats.handled, 1);
/// ```
pub fn listen<D, L>(
    dispatcher: Arc<D>,
    queue_name: &str,
    listener: L,
    poll_interval: Duration,
) -> ListenerHandle
where
    D: Dispatcher + ?Sized + 'static,
    L: Listener + 'static,
{
    let queue = queue_name.to_string();
    let timeout_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX);
    let (stop_tx, stop_rx) = channel();

    let handle = thread::spawn(move || {
        let mut stats = ListenerStats::default();
        debug!(queue = %queue, "listener started");

        while !stop_requested(&stop_rx, None) {
            stats.polls += 1;
            match listener.listen(&queue, timeout_ms) {
                Ok(Some(message)) => {
                    let id = message.id.clone();
                    let outcome = dispatcher.dispatch(Command::new::<Message>(message));
                    stats.record(&queue, &id, outcome);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(queue = %queue, error = %err, "listen failed, backing off");
                    stats.errors += 1;
                    if stop_requested(&stop_rx, Some(poll_interval)) {
                        break;
                    }
                }
            }
        }

        debug!(queue = %queue, ?stats, "listener stopped");
        stats
    });

    ListenerHandle {
        stop_tx,
        handle: Some(handle),
    }
}
