//! Handler module - callbacks and dispatched task tracking.
//!
//! Provides:
//! - [`FrameHandler`] - receives each decoded frame (the listener's `on_frame`)
//! - [`ChangeHandler`] - receives each change batch (the monitor's `on_change`)
//! - [`HandlerTasks`] - retained set of spawned handler tasks with reap/drain
//!
//! # Example
//!
//! ```ignore
//! use ramwire::handler::HandlerTasks;
//!
//! let tasks = HandlerTasks::new();
//! tasks.spawn(async move { handler.on_frame(frame).await });
//!
//! // Later, periodically
//! tasks.reap().await;
//!
//! // On shutdown
//! tasks.drain().await;
//! ```

mod callback;
mod tasks;

pub use callback::{BoxFuture, ChangeHandler, FrameHandler, HandlerResult};
pub use tasks::{HandlerTasks, TaskStats};
