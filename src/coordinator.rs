//! Coordinator builder and lifecycle.
//!
//! The [`CoordinatorBuilder`] wires a frame handler to a listener. The
//! running [`Coordinator`] owns:
//! 1. The [`FrameListener`] and its reader tasks
//! 2. A reaper that collects finished handler tasks every `reap_interval`
//!
//! [`Coordinator::shutdown`] drains outstanding handler tasks before it stops
//! the listener, so no frame already taken off the wire is lost.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ramwire::{ChangeMonitor, Coordinator, CoordinatorConfig, RamChangeInfo};
//!
//! #[tokio::main]
//! async fn main() -> ramwire::Result<()> {
//!     let monitor = ChangeMonitor::new([0xD164], |info: RamChangeInfo| async move {
//!         println!("{}", serde_json::to_string(&info)?);
//!         Ok(())
//!     });
//!
//!     let coordinator = Coordinator::builder()
//!         .config(CoordinatorConfig::default())
//!         .on_frame(monitor)
//!         .start()
//!         .await?;
//!
//!     coordinator.run_until(tokio::signal::ctrl_c()).await
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{CoordinatorConfig, ListenerConfig};
use crate::error::{RamwireError, Result};
use crate::handler::{FrameHandler, HandlerTasks, TaskStats};
use crate::transport::FrameListener;

/// Builder for configuring and starting a [`Coordinator`].
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    handler: Option<Arc<dyn FrameHandler>>,
}

impl CoordinatorBuilder {
    /// Create a builder with default configuration and no handler.
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            handler: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the listener configuration.
    pub fn listener_config(mut self, listener: ListenerConfig) -> Self {
        self.config.listener = listener;
        self
    }

    /// Set the reaper period.
    ///
    /// Default: 10 seconds
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.reap_interval(interval);
        self
    }

    /// Set the frame handler.
    pub fn on_frame(mut self, handler: impl FrameHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set an already shared frame handler, e.g. an `Arc<ChangeMonitor>`
    /// the caller also inspects.
    pub fn on_frame_shared(mut self, handler: Arc<dyn FrameHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Start the listener and the reaper.
    ///
    /// # Errors
    ///
    /// [`RamwireError::Config`] if no frame handler was set, or
    /// [`RamwireError::Io`] if the socket cannot be bound.
    pub async fn start(self) -> Result<Coordinator> {
        let handler = self
            .handler
            .ok_or_else(|| RamwireError::Config("no frame handler registered".to_string()))?;
        Coordinator::start_shared(self.config, handler).await
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running listener plus its reaper.
pub struct Coordinator {
    listener: FrameListener,
    local_addr: SocketAddr,
    reaper: JoinHandle<()>,
    reaper_cancel: CancellationToken,
}

impl Coordinator {
    /// Create a new coordinator builder.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Start with `config`, dispatching frames to `handler`.
    pub async fn start(config: CoordinatorConfig, handler: impl FrameHandler) -> Result<Self> {
        Self::start_shared(config, Arc::new(handler)).await
    }

    async fn start_shared(
        config: CoordinatorConfig,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Self> {
        let mut listener = FrameListener::with_shared_handler(config.listener, handler);
        let local_addr = listener.start().await?;

        let reaper_cancel = CancellationToken::new();
        let reaper = spawn_reaper(
            Arc::downgrade(listener.tasks()),
            config.reap_interval,
            reaper_cancel.clone(),
        );

        Ok(Self {
            listener,
            local_addr,
            reaper,
            reaper_cancel,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handler task counters.
    pub fn stats(&self) -> TaskStats {
        self.listener.tasks().stats()
    }

    /// Dispatched handler tasks.
    pub fn tasks(&self) -> &Arc<HandlerTasks> {
        self.listener.tasks()
    }

    /// Number of connected emulator clients.
    pub fn connection_count(&self) -> usize {
        self.listener.connection_count()
    }

    /// Await every outstanding handler task, including ones dispatched while
    /// draining. The listener keeps running.
    pub async fn drain(&self) {
        self.listener.tasks().drain().await;
    }

    /// Drain handler tasks, stop the listener, and stop the reaper.
    ///
    /// Every handler task dispatched before this call has completed when it
    /// returns. Frames that readers dispatch while the first drain runs are
    /// drained as well once the readers are cancelled.
    pub async fn shutdown(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr, "Shutting down");

        self.drain().await;
        self.listener.stop().await?;
        self.drain().await;

        self.reaper_cancel.cancel();
        if let Err(e) = self.reaper.await {
            tracing::error!("Reaper task ended abnormally: {}", e);
        }

        let stats = self.listener.tasks().stats();
        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            "Shutdown complete"
        );
        Ok(())
    }

    /// Run until `signal` resolves, then shut down.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future,
    {
        signal.await;
        self.shutdown().await
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("local_addr", &self.local_addr)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

/// The reaper holds a weak reference so a dropped coordinator also ends it.
fn spawn_reaper(
    tasks: Weak<HandlerTasks>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(tasks) = tasks.upgrade() else { break };
                    tasks.reap().await;
                }
            }
        }
        tracing::debug!("Reaper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PayloadFormat;
    use crate::frame::RamFrame;
    use crate::handler::HandlerResult;
    use crate::protocol::encode_message;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn ephemeral() -> ListenerConfig {
        ListenerConfig::default().bind_addr(([127, 0, 0, 1], 0).into())
    }

    async fn send(addr: SocketAddr, frames: impl IntoIterator<Item = u64>) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for n in frames {
            let msg =
                encode_message(&RamFrame::from_pairs(n, [(1, n)]), PayloadFormat::Json).unwrap();
            stream.write_all(&msg).await.unwrap();
        }
        stream
    }

    #[tokio::test]
    async fn test_builder_requires_handler() {
        let err = Coordinator::builder()
            .listener_config(ephemeral())
            .start()
            .await
            .unwrap_err();
        assert!(matches!(err, RamwireError::Config(_)));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_slow_handlers() {
        let done = Arc::new(AtomicU64::new(0));
        let handler_done = done.clone();
        let coordinator = Coordinator::builder()
            .listener_config(ephemeral())
            .on_frame(move |_frame: RamFrame| {
                let done = handler_done.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    HandlerResult::Ok(())
                }
            })
            .start()
            .await
            .unwrap();

        let _client = send(coordinator.local_addr(), 1..=5).await;
        for _ in 0..200 {
            if coordinator.stats().retained == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(coordinator.stats().retained, 5);
        assert_eq!(done.load(Ordering::SeqCst), 0);

        coordinator.shutdown().await.unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_reaper_collects_finished_tasks() {
        let coordinator = Coordinator::builder()
            .listener_config(ephemeral())
            .reap_interval(Duration::from_millis(20))
            .on_frame(|_frame: RamFrame| async { HandlerResult::Ok(()) })
            .start()
            .await
            .unwrap();

        let _client = send(coordinator.local_addr(), 1..=10).await;

        let mut stats = coordinator.stats();
        for _ in 0..200 {
            stats = coordinator.stats();
            if stats.completed == 10 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.retained, 0);

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_failures_are_counted_not_fatal() {
        let coordinator = Coordinator::builder()
            .listener_config(ephemeral())
            .on_frame(|frame: RamFrame| async move {
                if frame.frame % 2 == 0 {
                    Err(RamwireError::handler("even frame"))
                } else {
                    Ok(())
                }
            })
            .start()
            .await
            .unwrap();

        let _client = send(coordinator.local_addr(), 1..=4).await;
        for _ in 0..200 {
            if coordinator.stats().retained == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        coordinator.drain().await;

        let stats = coordinator.stats();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(coordinator.connection_count(), 1);

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_until_signal() {
        let coordinator = Coordinator::start(
            CoordinatorConfig::default().listener(ephemeral()),
            |_frame: RamFrame| async { HandlerResult::Ok(()) },
        )
        .await
        .unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(coordinator.run_until(async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        running.await.unwrap().unwrap();
    }
}
