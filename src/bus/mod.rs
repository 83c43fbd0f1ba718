//! In-process queue integration.
//!
//! Lets a dispatcher consume serialized commands from a named queue:
//!
//! ```text
//! ┌──────────┐  send(queue, msg)  ┌───────────────┐  listen()  ┌────────────────┐
//! │ producer │ ─────────────────▶ │ InMemoryQueue │ ─────────▶ │ listener thread│
//! └──────────┘                    └───────────────┘            └───────┬────────┘
//!                                                                      │ dispatch(Command(msg))
//!                                                                      ▼
//!                                                            ┌──────────────────┐
//!                                                            │    Dispatcher    │
//!                                                            │ on_message(...)  │
//!                                                            └──────────────────┘
//! ```
//!
//! `Sender` and `Listener` are traits, so another in-process queue can be
//! plugged in in place of `InMemoryQueue`.

mod in_memory_queue;
mod listener;
mod message;
mod sender;
mod transport;

pub use in_memory_queue::InMemoryQueue;
pub use listener::Listener;
pub use message::{on_message, Message, MessageHandler, QueueError};
pub use sender::Sender;
pub use transport::{listen, ListenerHandle, ListenerStats};
