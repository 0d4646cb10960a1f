//! Retained set of dispatched handler tasks.
//!
//! Every frame handler runs as a detached tokio task, but the listener keeps
//! its `JoinHandle` here until the task has finished and been collected.
//! Collection happens two ways:
//!
//! - [`HandlerTasks::reap`] removes tasks that already finished (periodic)
//! - [`HandlerTasks::drain`] awaits every retained task, including tasks
//!   spawned while the drain is running (shutdown)
//!
//! Handler errors and panics are counted and logged when collected; they are
//! never retried.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};

use super::HandlerResult;

/// Snapshot of handler task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Tasks spawned and not yet collected (running or finished).
    pub retained: usize,
    /// Tasks that are still running.
    pub in_flight: usize,
    /// Collected tasks that returned `Ok`.
    pub completed: u64,
    /// Collected tasks that returned an error or panicked.
    pub failed: u64,
}

/// Tracks spawned handler tasks until they are reaped or drained.
#[derive(Debug, Default)]
pub struct HandlerTasks {
    handles: Mutex<Vec<JoinHandle<HandlerResult>>>,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl HandlerTasks {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime and retain its handle.
    ///
    /// The handle is pushed under the same lock a drain takes, so a drain
    /// never misses a task spawned before it observed an empty set.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        let mut handles = self.handles.lock();
        handles.push(tokio::spawn(task));
    }

    /// Remove and collect every task that has already finished.
    ///
    /// Returns the number of tasks removed. Running tasks are left untouched.
    pub async fn reap(&self) -> usize {
        let finished: Vec<_> = {
            let mut handles = self.handles.lock();
            let (finished, running) = std::mem::take(&mut *handles)
                .into_iter()
                .partition(|handle: &JoinHandle<HandlerResult>| handle.is_finished());
            *handles = running;
            finished
        };

        let count = finished.len();
        for handle in finished {
            self.record(handle.await);
        }
        if count > 0 {
            tracing::debug!(reaped = count, "Reaped finished handler tasks");
        }
        count
    }

    /// Await every retained task until the set is empty.
    ///
    /// Tasks added while draining are awaited too.
    pub async fn drain(&self) {
        loop {
            let batch = std::mem::take(&mut *self.handles.lock());
            if batch.is_empty() {
                return;
            }
            tracing::debug!(tasks = batch.len(), "Draining handler tasks");
            for handle in batch {
                self.record(handle.await);
            }
        }
    }

    /// Number of retained tasks (running or finished but not yet collected).
    pub fn retained(&self) -> usize {
        self.handles.lock().len()
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Current counters.
    pub fn stats(&self) -> TaskStats {
        let (retained, in_flight) = {
            let handles = self.handles.lock();
            let running = handles.iter().filter(|h| !h.is_finished()).count();
            (handles.len(), running)
        };
        TaskStats {
            retained,
            in_flight,
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    fn record(&self, outcome: std::result::Result<HandlerResult, JoinError>) {
        match outcome {
            Ok(Ok(())) => {
                self.completed.fetch_add(1, Ordering::AcqRel);
            }
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!(error = %e, "Handler task failed");
            }
            Err(e) if e.is_panic() => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                tracing::error!("Handler task panicked: {}", e);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!("Handler task cancelled: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RamwireError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_reap_removes_only_finished() {
        let tasks = HandlerTasks::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        tasks.spawn(async { HandlerResult::Ok(()) });
        tasks.spawn(async move {
            let _ = release_rx.await;
            HandlerResult::Ok(())
        });

        // Let the first task finish
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(tasks.reap().await, 1);
        assert_eq!(tasks.retained(), 1);
        assert_eq!(tasks.in_flight(), 1);

        release_tx.send(()).unwrap();
        tasks.drain().await;

        let stats = tasks.stats();
        assert_eq!(stats.retained, 0);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 0);
    }

    async fn explode() -> HandlerResult {
        panic!("handler panicked")
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_counted() {
        let tasks = HandlerTasks::new();

        tasks.spawn(async { HandlerResult::Err(RamwireError::handler("boom")) });
        tasks.spawn(explode());
        tasks.spawn(async { HandlerResult::Ok(()) });

        tasks.drain().await;

        let stats = tasks.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_drain_awaits_tasks_spawned_during_drain() {
        let tasks = Arc::new(HandlerTasks::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let inner_tasks = tasks.clone();
        let inner_finished = finished.clone();
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let late_finished = inner_finished.clone();
            inner_tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                late_finished.fetch_add(1, Ordering::SeqCst);
                HandlerResult::Ok(())
            });
            inner_finished.fetch_add(1, Ordering::SeqCst);
            HandlerResult::Ok(())
        });

        tasks.drain().await;

        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.retained(), 0);
        assert_eq!(tasks.stats().completed, 2);
    }

    #[tokio::test]
    async fn test_drain_empty_returns_immediately() {
        let tasks = HandlerTasks::new();
        tasks.drain().await;
        assert_eq!(tasks.stats(), TaskStats::default());
    }
}
