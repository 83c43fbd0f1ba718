//! Messages carried by the in-process queue.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::dispatcher::Dispatcher;
use crate::error::HandlerError;
use crate::handler::Handler;

/// A serialized command travelling through a queue.
///
/// When a listener pulls a `Message` off a queue it dispatches it as a
/// [`Command`]; handlers built with [`on_message`] match it by
/// `message_type`.
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique identifier for this message
    pub id: String,
    /// Message type (e.g., "order.create", "counter.increment")
    pub message_type: String,
    /// Serialized payload (bitcode or JSON)
    pub payload: Vec<u8>,
    /// Optional metadata (correlation IDs, user IDs, etc.)
    pub metadata: Option<Vec<(String, String)>>,
}

impl Message {
    pub fn new(id: impl Into<String>, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            payload,
            metadata: None,
        }
    }

    /// Create a message with a bitcode-serialized payload.
    pub fn encode<T: serde::Serialize>(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(Self::new(id, message_type, bytes))
    }

    /// Decode a bitcode payload.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(&self.payload)
    }

    /// Create a message with a JSON-serialized payload.
    pub fn json<T: serde::Serialize>(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(payload)?;
        Ok(Self::new(id, message_type, bytes))
    }

    /// Decode a JSON payload.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    pub fn with_string_payload(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(id, message_type, payload.into().into_bytes())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Look up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Error type for queue operations.
#[derive(Debug)]
pub enum QueueError {
    /// A queue lock was poisoned by a panicking thread.
    Poisoned(String),
    /// The queue no longer accepts messages.
    Closed(String),
    /// Other error
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Poisoned(msg) => write!(f, "queue lock poisoned: {}", msg),
            QueueError::Closed(queue) => write!(f, "queue closed: {}", queue),
            QueueError::Other(e) => write!(f, "queue error: {}", e),
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueueError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Handler for `Message` commands of one `message_type`.
pub struct MessageHandler<A> {
    message_type: String,
    act: A,
}

impl<A> Handler for MessageHandler<A>
where
    A: Fn(&Message, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync,
{
    fn can_handle(&self, command: &Command) -> bool {
        command
            .downcast_ref::<Message>()
            .map(|msg| msg.message_type == self.message_type)
            .unwrap_or(false)
    }

    fn handle(&self, command: &Command, dispatcher: &dyn Dispatcher) -> Result<(), HandlerError> {
        let msg = command.downcast_ref::<Message>().ok_or_else(|| {
            HandlerError::Failed(format!("expected a message, got {}", command.type_name()))
        })?;
        (self.act)(msg, dispatcher)
    }

    fn name(&self) -> &str {
        &self.message_type
    }
}

/// Build a handler for messages of the given type.
///
/// ```
/// use sourced_dispatch::bus::{on_message, Message};
/// use sourced_dispatch::{Command, Dispatcher, SerialDispatcher};
///
/// let dispatcher = SerialDispatcher::new(vec![on_message("ping", |msg, _d| {
///     assert_eq!(msg.payload_str(), Some("hello"));
///     Ok(())
/// })]);
///
/// let msg = Message::with_string_payload("m-1", "ping", "hello");
/// dispatcher.dispatch(Command::new(msg)).unwrap();
/// ```
pub fn on_message<A>(message_type: impl Into<String>, act: A) -> Arc<dyn Handler>
where
    A: Fn(&Message, &dyn Dispatcher) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(MessageHandler {
        message_type: message_type.into(),
        act,
    })
}
