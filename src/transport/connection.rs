//! Per-connection reader loop.
//!
//! One reader runs per accepted emulator connection:
//!
//! ```text
//! AwaitingLength -> AwaitingPayload -> dispatch -> AwaitingLength ...
//!               \-> closed (EOF on a message boundary, or cancellation)
//! ```
//!
//! Any error (I/O, short read, oversized prefix, undecodable payload) ends
//! this connection only. Dispatch never waits for the handler itself; it only
//! waits for a free handler slot when in-flight handlers are bounded.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::codec::PayloadFormat;
use crate::error::Result;
use crate::frame::RamFrame;
use crate::handler::{FrameHandler, HandlerTasks};
use crate::protocol::FrameBuffer;

/// State shared by the listener and all of its readers.
pub(crate) struct ConnectionContext {
    pub(crate) handler: Arc<dyn FrameHandler>,
    pub(crate) tasks: Arc<HandlerTasks>,
    /// Handler slots; `None` when in-flight handlers are unbounded.
    pub(crate) slots: Option<Arc<Semaphore>>,
    pub(crate) format: PayloadFormat,
    pub(crate) max_payload_size: u64,
    pub(crate) read_buffer_size: usize,
}

/// Reader for a single connection.
pub(crate) struct Connection {
    peer: SocketAddr,
    ctx: Arc<ConnectionContext>,
    frames: u64,
}

impl Connection {
    pub(crate) fn new(peer: SocketAddr, ctx: Arc<ConnectionContext>) -> Self {
        Self {
            peer,
            ctx,
            frames: 0,
        }
    }

    /// Number of frames dispatched so far.
    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    /// Read and dispatch frames until EOF, error, or cancellation.
    ///
    /// Clean EOF and cancellation return `Ok(())`.
    pub(crate) async fn run<R>(&mut self, mut reader: R, cancel: CancellationToken) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = FrameBuffer::with_capacity_and_max_payload(
            self.ctx.read_buffer_size,
            self.ctx.max_payload_size,
        );
        let mut buf = vec![0u8; self.ctx.read_buffer_size];

        loop {
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(peer = %self.peer, "Reader cancelled");
                    return Ok(());
                }
                read = reader.read(&mut buf) => read?,
            };

            if n == 0 {
                return buffer.finish();
            }

            // Cancellation only interrupts the socket read. Every payload
            // already taken off the wire is dispatched.
            for payload in buffer.push(&buf[..n])? {
                let frame = self.ctx.format.decode_frame(&payload)?;
                self.dispatch(frame, &cancel).await;
            }
        }
    }

    /// Spawn the handler for `frame` as its own task.
    async fn dispatch(&mut self, frame: RamFrame, cancel: &CancellationToken) {
        let permit = self.acquire_slot(cancel).await;

        tracing::debug!(
            peer = %self.peer,
            frame = frame.frame,
            cells = frame.len(),
            "Processing RAM frame"
        );

        let handler = Arc::clone(&self.ctx.handler);
        self.ctx.tasks.spawn(async move {
            // Slot is held until the handler completes
            let _permit = permit;
            handler.on_frame(frame).await
        });
        self.frames += 1;
    }

    /// Wait for a handler slot.
    ///
    /// Returns `None` when handlers are unbounded, or when the reader is
    /// cancelled while waiting. In that case the frame runs outside the bound
    /// so the drain that follows cancellation still sees it.
    async fn acquire_slot(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        let slots = self.ctx.slots.as_ref()?;

        // Fast path, no waiting
        if let Ok(permit) = Arc::clone(slots).try_acquire_owned() {
            return Some(permit);
        }

        tracing::trace!(peer = %self.peer, "Handler slots exhausted, waiting");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    peer = %self.peer,
                    "Reader cancelled while waiting for a handler slot, dispatching unbounded"
                );
                None
            }
            permit = Arc::clone(slots).acquire_owned() => permit.ok(),
        }
    }
}
