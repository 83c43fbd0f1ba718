//! In-memory named queues for tests and single-process applications.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::{Listener, Message, QueueError, Sender};

/// In-memory point-to-point queues, keyed by name.
///
/// Features:
/// - Thread-safe (clones share the same queues)
/// - Each message is taken by exactly one listener
/// - Listeners block on a `Condvar` until a message arrives or they time out
///
/// ## Example
///
/// ```
/// use sourced_dispatch::bus::{InMemoryQueue, Listener, Message, Sender};
///
/// let queue = InMemoryQueue::new();
/// queue.send("orders", Message::with_string_payload("m-1", "order.create", "{}")).unwrap();
///
/// let msg = queue.listen("orders", 100).unwrap().unwrap();
/// assert_eq!(msg.message_type, "order.create");
/// assert!(queue.listen("orders", 10).unwrap().is_none());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    queues: Mutex<HashMap<String, VecDeque<Message>>>,
    arrived: Condvar,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting on a queue.
    pub fn len(&self, queue: &str) -> usize {
        self.inner
            .queues
            .lock()
            .map(|queues| queues.get(queue).map(VecDeque::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Names of every queue that has ever received a message.
    pub fn queue_names(&self) -> Vec<String> {
        self.inner
            .queues
            .lock()
            .map(|queues| queues.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Sender for InMemoryQueue {
    fn send(&self, queue: &str, message: Message) -> Result<(), QueueError> {
        let mut queues = self
            .inner
            .queues
            .lock()
            .map_err(|e| QueueError::Poisoned(e.to_string()))?;
        queues.entry(queue.to_string()).or_default().push_back(message);
        self.inner.arrived.notify_all();
        Ok(())
    }
}

impl Listener for InMemoryQueue {
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Message>, QueueError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut queues = self
            .inner
            .queues
            .lock()
            .map_err(|e| QueueError::Poisoned(e.to_string()))?;

        loop {
            if let Some(message) = queues.get_mut(queue).and_then(VecDeque::pop_front) {
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let (guard, _timeout) = self
                .inner
                .arrived
                .wait_timeout(queues, deadline - now)
                .map_err(|e| QueueError::Poisoned(e.to_string()))?;
            queues = guard;
        }
    }
}
