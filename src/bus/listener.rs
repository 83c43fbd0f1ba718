//! Listener trait for point-to-point messaging.

use super::message::{Message, QueueError};

/// Trait for listening on a named queue.
///
/// Listeners on the same queue compete: each message is delivered to
/// exactly one of them.
pub trait Listener: Send + Sync {
    /// Take the next message from a named queue, blocking until one is
    /// available or the timeout expires.
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Message>, QueueError>;
}
