//! Callback traits for frame and change handlers.
//!
//! Both traits are implemented for plain async closures, so most callers
//! never name them:
//!
//! ```
//! use ramwire::handler::{FrameHandler, HandlerResult};
//! use ramwire::RamFrame;
//!
//! fn takes_handler(_: impl FrameHandler) {}
//!
//! takes_handler(|frame: RamFrame| async move {
//!     tracing::info!(frame = frame.frame, "got frame");
//!     HandlerResult::Ok(())
//! });
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::frame::RamFrame;
use crate::monitor::RamChangeInfo;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives every decoded frame from the listener.
///
/// Each call runs in its own spawned task. Failures are recorded on that
/// task and never reach the connection's reader loop.
pub trait FrameHandler: Send + Sync + 'static {
    /// Handle one decoded frame.
    fn on_frame(&self, frame: RamFrame) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> FrameHandler for F
where
    F: Fn(RamFrame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn on_frame(&self, frame: RamFrame) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(frame))
    }
}

/// Receives every non-empty change batch from a [`ChangeMonitor`](crate::ChangeMonitor).
pub trait ChangeHandler: Send + Sync + 'static {
    /// Handle one change batch. Ownership of the batch moves to the handler.
    fn on_change(&self, info: RamChangeInfo) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> ChangeHandler for F
where
    F: Fn(RamChangeInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn on_change(&self, info: RamChangeInfo) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RamwireError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_closure_as_frame_handler() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = seen.clone();
        let handler = move |frame: RamFrame| {
            let seen = seen_clone.clone();
            async move {
                seen.store(frame.frame, Ordering::SeqCst);
                HandlerResult::Ok(())
            }
        };

        handler
            .on_frame(RamFrame::from_pairs(42, [(1, 1)]))
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn test_closure_as_change_handler_propagates_error() {
        let handler = |_info: RamChangeInfo| async {
            HandlerResult::Err(RamwireError::handler("delivery failed"))
        };

        let info = RamChangeInfo {
            frame: 2,
            old_frame: Some(1),
            events: Vec::new(),
        };
        let err = handler.on_change(info).await.unwrap_err();

        assert!(matches!(err, RamwireError::Handler(msg) if msg == "delivery failed"));
    }

    #[test]
    fn test_handlers_are_object_safe() {
        let frame_handler: Arc<dyn FrameHandler> =
            Arc::new(|_: RamFrame| async { HandlerResult::Ok(()) });
        let change_handler: Arc<dyn ChangeHandler> =
            Arc::new(|_: RamChangeInfo| async { HandlerResult::Ok(()) });
        drop((frame_handler, change_handler));
    }
}
