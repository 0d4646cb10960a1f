//! Transport module - TCP listener and per-connection readers.
//!
//! The emulator side connects over TCP and streams length-prefixed frame
//! messages. Each connection is served by its own reader task; see
//! [`FrameListener`].

mod connection;
mod listener;

pub use listener::FrameListener;
