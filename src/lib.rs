//! # ramwire
//!
//! Listener and change monitor for emulator RAM frame streams.
//!
//! An emulator-side script connects over TCP and streams one message per
//! emulated frame: an 8-byte native-endian length prefix followed by a
//! JSON (or MessagePack) payload of `{frame, cells: [{location, value}]}`.
//!
//! ## Architecture
//!
//! - **Listener** ([`FrameListener`]): one reader task per connection,
//!   every decoded frame dispatched to a [`FrameHandler`] as its own task
//! - **Monitor** ([`ChangeMonitor`]): diffs each newer frame against the last
//!   accepted one and emits a [`RamChangeInfo`] for subscribed addresses
//! - **Coordinator** ([`Coordinator`]): runs the listener plus a periodic
//!   reaper, and drains handler tasks on shutdown
//!
//! ## Example
//!
//! ```ignore
//! use ramwire::{ChangeMonitor, Coordinator, RamChangeInfo};
//!
//! #[tokio::main]
//! async fn main() -> ramwire::Result<()> {
//!     let monitor = ChangeMonitor::new([0xD164, 0xD165], |info: RamChangeInfo| async move {
//!         for event in &info.events {
//!             println!("{:#06x}: {:?} -> {}", event.location, event.old, event.new);
//!         }
//!         Ok(())
//!     });
//!
//!     let coordinator = Coordinator::builder().on_frame(monitor).start().await?;
//!     coordinator.run_until(tokio::signal::ctrl_c()).await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod monitor;
pub mod protocol;
pub mod transport;

mod coordinator;
mod frame;

pub use codec::PayloadFormat;
pub use config::{CoordinatorConfig, ListenerConfig};
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{RamwireError, Result};
pub use frame::{Address, CellValue, MemoryCell, RamFrame};
pub use handler::{ChangeHandler, FrameHandler, HandlerResult, TaskStats};
pub use monitor::{ChangeMonitor, RamChangeInfo, RamEvent, Subscription};
pub use transport::FrameListener;
