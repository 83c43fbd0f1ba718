//! Sender trait for point-to-point messaging.

use super::message::{Message, QueueError};

/// Trait for sending messages to a named queue.
///
/// Each message sent is consumed by exactly one listener on that queue
/// (competing consumers).
pub trait Sender: Send + Sync {
    /// Send a message to a named queue.
    fn send(&self, queue: &str, message: Message) -> Result<(), QueueError>;
}
