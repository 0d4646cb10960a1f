//! Change monitor - turns a stream of frames into change batches.
//!
//! The [`ChangeMonitor`] holds the most recently accepted frame and, for every
//! newer frame, emits one [`RamChangeInfo`] listing the subscribed addresses
//! whose values changed. It implements [`FrameHandler`], so it plugs straight
//! into a [`FrameListener`](crate::FrameListener):
//!
//! ```ignore
//! let monitor = Arc::new(ChangeMonitor::new([0xD164, 0xD165], |info| async move {
//!     deliver(info).await
//! }));
//! let listener = FrameListener::with_shared_handler(config, monitor.clone());
//! ```
//!
//! # Ordering
//!
//! Handler tasks may finish out of order. A frame whose number is not strictly
//! greater than the latest accepted frame is dropped without touching state,
//! so late deliveries are harmless. The check and the state update happen
//! under one lock that is released before the change callback is awaited.

mod diff;
mod events;

pub use diff::{diff_frames, Subscription};
pub use events::{RamChangeInfo, RamEvent};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::{Address, RamFrame};
use crate::handler::{BoxFuture, ChangeHandler, FrameHandler, HandlerResult};

/// Stateful diff engine over a fixed subscription.
pub struct ChangeMonitor {
    /// Addresses to report on.
    subscription: Subscription,
    /// Highest-numbered frame accepted so far.
    latest: Mutex<Option<RamFrame>>,
    /// Receives every non-empty change batch.
    on_change: Arc<dyn ChangeHandler>,
}

impl ChangeMonitor {
    /// Create a monitor for `subscription` that reports to `on_change`.
    pub fn new<I, H>(subscription: I, on_change: H) -> Self
    where
        I: IntoIterator<Item = Address>,
        H: ChangeHandler,
    {
        Self::with_shared_handler(Subscription::new(subscription), Arc::new(on_change))
    }

    /// Create a monitor with an already shared change handler.
    pub fn with_shared_handler(
        subscription: Subscription,
        on_change: Arc<dyn ChangeHandler>,
    ) -> Self {
        Self {
            subscription,
            latest: Mutex::new(None),
            on_change,
        }
    }

    /// Handle one frame: diff, update state, and await the change callback
    /// if anything changed.
    ///
    /// Stale frames return `Ok(())` without emitting anything. A callback
    /// error is returned as-is; the monitor state has already moved on.
    pub async fn handle(&self, frame: RamFrame) -> HandlerResult {
        self.on_frame(frame).await
    }

    /// Apply `frame` to the monitor state and build its change batch.
    ///
    /// Returns `None` when the frame is stale or no subscribed value changed.
    /// This is the synchronous part of [`handle`](Self::handle); it never
    /// suspends while holding the state lock.
    pub fn observe(&self, frame: RamFrame) -> Option<RamChangeInfo> {
        let mut latest = self.latest.lock();

        if let Some(current) = latest.as_ref() {
            if frame.frame <= current.frame {
                tracing::debug!(
                    frame = frame.frame,
                    latest = current.frame,
                    "Dropping stale frame"
                );
                return None;
            }
        }

        let events = diff_frames(&self.subscription, latest.as_ref(), &frame);
        let new_frame = frame.frame;
        let old_frame = latest.replace(frame).map(|old| old.frame);
        drop(latest);

        if events.is_empty() {
            return None;
        }

        tracing::debug!(
            frame = new_frame,
            old_frame = ?old_frame,
            events = events.len(),
            "Subscribed RAM changed"
        );
        Some(RamChangeInfo {
            frame: new_frame,
            old_frame,
            events,
        })
    }

    /// Frame number of the latest accepted frame.
    pub fn latest_frame_number(&self) -> Option<u64> {
        self.latest.lock().as_ref().map(|frame| frame.frame)
    }

    /// Clone of the latest accepted frame.
    pub fn latest_frame(&self) -> Option<RamFrame> {
        self.latest.lock().clone()
    }

    /// The subscribed addresses.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl FrameHandler for ChangeMonitor {
    fn on_frame(&self, frame: RamFrame) -> BoxFuture<'static, HandlerResult> {
        let change = self.observe(frame);
        let on_change = Arc::clone(&self.on_change);
        Box::pin(async move {
            match change {
                Some(info) => on_change.on_change(info).await,
                None => Ok(()),
            }
        })
    }
}

impl fmt::Debug for ChangeMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeMonitor")
            .field("subscription", &self.subscription)
            .field("latest_frame", &self.latest_frame_number())
            .finish_non_exhaustive()
    }
}
