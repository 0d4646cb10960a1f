//! TCP frame listener.
//!
//! # Example
//!
//! ```ignore
//! use ramwire::{FrameListener, ListenerConfig, RamFrame};
//!
//! let mut listener = FrameListener::new(ListenerConfig::default(), |frame: RamFrame| async move {
//!     tracing::info!(frame = frame.frame, "frame");
//!     Ok(())
//! });
//! let addr = listener.start().await?;
//! // ...
//! listener.stop().await?;
//! listener.tasks().drain().await;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::connection::{Connection, ConnectionContext};
use crate::config::ListenerConfig;
use crate::error::{RamwireError, Result};
use crate::handler::{FrameHandler, HandlerTasks};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type Readers = Arc<Mutex<HashMap<SocketAddr, JoinHandle<()>>>>;

/// Accepts emulator connections and dispatches every decoded frame to a
/// [`FrameHandler`] as its own task.
///
/// The listener retains each handler task in its [`HandlerTasks`] set until
/// the task is reaped or drained. [`stop`](Self::stop) does not wait for
/// handler tasks; drain [`tasks`](Self::tasks) for that.
pub struct FrameListener {
    config: ListenerConfig,
    ctx: Arc<ConnectionContext>,
    running: Option<Running>,
}

/// Live state between `start` and `stop`.
struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
    readers: Readers,
}

impl FrameListener {
    /// Create a listener that dispatches frames to `handler`.
    pub fn new(config: ListenerConfig, handler: impl FrameHandler) -> Self {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    /// Create a listener with an already shared handler.
    pub fn with_shared_handler(config: ListenerConfig, handler: Arc<dyn FrameHandler>) -> Self {
        let ctx = ConnectionContext {
            handler,
            tasks: Arc::new(HandlerTasks::new()),
            slots: config
                .max_in_flight_handlers
                .map(|limit| Arc::new(Semaphore::new(limit))),
            format: config.payload_format,
            max_payload_size: config.max_payload_size,
            read_buffer_size: config.read_buffer_size,
        };
        Self {
            config,
            ctx: Arc::new(ctx),
            running: None,
        }
    }

    /// Bind the socket and begin accepting connections.
    ///
    /// Returns the bound address once the socket is listening. Each accepted
    /// connection gets exactly one reader task.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(RamwireError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let readers: Readers = Arc::new(Mutex::new(HashMap::new()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            self.ctx.clone(),
            readers.clone(),
            cancel.clone(),
        ));

        tracing::info!(
            addr = %local_addr,
            format = %self.config.payload_format,
            "Listening for emulator frames"
        );

        self.running = Some(Running {
            local_addr,
            cancel,
            accept_task,
            readers,
        });
        Ok(local_addr)
    }

    /// Stop accepting, cancel every reader, and release the socket.
    ///
    /// Handler tasks already dispatched keep running.
    pub async fn stop(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(RamwireError::NotRunning)?;
        running.cancel.cancel();

        if let Err(e) = running.accept_task.await {
            tracing::error!("Accept loop ended abnormally: {}", e);
        }

        // The accept loop has exited, so no reader is added from here on
        let readers: Vec<_> = running.readers.lock().drain().collect();
        for (peer, reader) in readers {
            if let Err(e) = reader.await {
                tracing::error!(%peer, "Reader task ended abnormally: {}", e);
            }
        }

        tracing::info!(addr = %running.local_addr, "Listener stopped");
        Ok(())
    }

    /// Whether the listener is between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Number of connections with a live reader.
    pub fn connection_count(&self) -> usize {
        self.running
            .as_ref()
            .map(|r| r.readers.lock().len())
            .unwrap_or(0)
    }

    /// Dispatched handler tasks.
    pub fn tasks(&self) -> &Arc<HandlerTasks> {
        &self.ctx.tasks
    }

    /// The configuration this listener was built with.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

impl Drop for FrameListener {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for FrameListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameListener")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .field("tasks", &self.ctx.tasks)
            .finish_non_exhaustive()
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    readers: Readers,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_reader(stream, peer, &ctx, &readers, &cancel),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
        }
    }
    // Dropping the listener here releases the socket
}

fn spawn_reader(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: &Arc<ConnectionContext>,
    readers: &Readers,
    cancel: &CancellationToken,
) {
    // Insert under the lock so a fast-exiting reader cannot remove itself
    // before it is registered
    let mut live = readers.lock();
    let reader = tokio::spawn(serve(
        stream,
        peer,
        ctx.clone(),
        readers.clone(),
        cancel.child_token(),
    ));
    live.insert(peer, reader);
}

async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ConnectionContext>,
    readers: Readers,
    cancel: CancellationToken,
) {
    tracing::info!(%peer, "Emulator connected");
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }

    let mut connection = Connection::new(peer, ctx);
    match connection.run(stream, cancel).await {
        Ok(()) => {
            tracing::info!(%peer, frames = connection.frames(), "Emulator disconnected");
        }
        Err(e) if e.is_connection_scoped() => {
            tracing::warn!(
                %peer,
                frames = connection.frames(),
                error = %e,
                "Connection closed with error"
            );
        }
        Err(e) => {
            tracing::error!(%peer, error = %e, "Reader failed");
        }
    }

    readers.lock().remove(&peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PayloadFormat;
    use crate::frame::RamFrame;
    use crate::handler::HandlerResult;
    use crate::protocol::encode_message;
    use tokio::io::AsyncWriteExt;

    fn ephemeral() -> ListenerConfig {
        ListenerConfig::default().bind_addr(([127, 0, 0, 1], 0).into())
    }

    fn noop(_frame: RamFrame) -> impl std::future::Future<Output = HandlerResult> {
        async { HandlerResult::Ok(()) }
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut listener = FrameListener::new(ephemeral(), noop);

        let addr = listener.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.local_addr(), Some(addr));
        assert!(matches!(
            listener.start().await,
            Err(RamwireError::AlreadyRunning)
        ));

        listener.stop().await.unwrap();
        assert!(!listener.is_running());
    }

    #[tokio::test]
    async fn test_stop_when_not_running_fails() {
        let mut listener = FrameListener::new(ephemeral(), noop);
        assert!(matches!(
            listener.stop().await,
            Err(RamwireError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_stop_releases_socket_and_cancels_readers() {
        let mut listener = FrameListener::new(ephemeral(), noop);
        let addr = listener.start().await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let msg = encode_message(&RamFrame::from_pairs(1, [(1, 1)]), PayloadFormat::Json).unwrap();
        client.write_all(&msg).await.unwrap();

        for _ in 0..100 {
            if listener.tasks().stats().completed + listener.tasks().retained() as u64 > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(listener.connection_count(), 1);

        // Client stays connected; stop must not wait for it
        tokio::time::timeout(Duration::from_secs(1), listener.stop())
            .await
            .expect("stop hung")
            .unwrap();
        assert_eq!(listener.connection_count(), 0);

        // Socket released
        TcpListener::bind(addr).await.unwrap();

        listener.tasks().drain().await;
        assert_eq!(listener.tasks().stats().completed, 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut listener = FrameListener::new(ephemeral(), noop);
        listener.start().await.unwrap();
        listener.stop().await.unwrap();
        listener.start().await.unwrap();
        listener.stop().await.unwrap();
    }
}
