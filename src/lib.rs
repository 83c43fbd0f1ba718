//! sourced_dispatch — in-process command dispatch.
//!
//! Register [`Handler`]s on a dispatcher, then dispatch [`Command`]s to
//! them. [`SerialDispatcher`] runs matching handlers one after another and
//! stops at the first error; [`ParallelDispatcher`] evaluates every
//! handler on its own thread, waits for all of them, and reports every
//! failure together in an [`ErrorGroup`].
//!
//! ```
//! use sourced_dispatch::{on, Command, Dispatcher, HandlerError, ParallelDispatcher};
//!
//! struct PlaceOrder { sku: String }
//!
//! let dispatcher = ParallelDispatcher::new(vec![
//!     on::<PlaceOrder, _>(|order, _d| {
//!         if order.sku.is_empty() {
//!             return Err(HandlerError::rejected("missing sku"));
//!         }
//!         Ok(())
//!     }),
//! ]);
//!
//! dispatcher.dispatch(Command::new(PlaceOrder { sku: "SKU-1".into() })).unwrap();
//! ```

mod command;
mod dispatcher;
mod error;
mod handler;

#[cfg(feature = "bus")]
pub mod bus;

pub use command::Command;
pub use dispatcher::{
    Dispatcher, HandlerRegistry, ParallelConfig, ParallelDispatcher, SerialDispatcher,
};
pub use error::{DispatchError, ErrorGroup, HandlerError, NoHandlerFoundError};
pub use handler::{handler_fn, on, FnHandler, Handler, TypedHandler};
