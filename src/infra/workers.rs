//! Tracking of in-flight workers.
//!
//! Every long-running task registers with a [`WorkerSet`] before it starts
//! and holds the returned [`WorkerGuard`] until it is done. Dropping the
//! guard deregisters the worker, also when the task returns early or panics.
//!
//! ```rust
//! # use services_api::infra::workers::WorkerSet;
//! # tokio_test::block_on(async {
//! let workers = WorkerSet::new();
//! let guard = workers.register().unwrap();
//! let task = tokio::spawn(async move {
//!     let _guard = guard;
//!     // Do some work...
//! });
//! workers.wait().await;
//! assert_eq!(0, workers.active());
//! # task.await.unwrap();
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Returned when registering into a closed [`WorkerSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("worker set is closed")]
pub struct WorkerSetClosed;

#[derive(Debug, Default)]
struct State {
    active: usize,
    closed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    idle: Notify,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A join barrier over a dynamic set of workers.
#[derive(Clone, Debug, Default)]
pub struct WorkerSet {
    inner: Arc<Inner>,
}

impl WorkerSet {
    /// Constructs a new, empty and open [`WorkerSet`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new worker.
    pub fn register(&self) -> Result<WorkerGuard, WorkerSetClosed> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(WorkerSetClosed);
        }
        state.active += 1;
        tracing::debug!(active = state.active, "Worker registered");
        Ok(WorkerGuard {
            inner: self.inner.clone(),
        })
    }

    /// Refuses all further registrations.
    /// Workers that are already registered are unaffected.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Whether the set refuses new registrations.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// The number of registered workers that have not yet completed.
    pub fn active(&self) -> usize {
        self.inner.lock().active
    }

    /// Completes once no workers are registered.
    pub async fn wait(&self) {
        loop {
            // Created before the check so a wakeup in between is not lost.
            let idle = self.inner.idle.notified();
            if self.active() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Keeps a worker registered until dropped.
#[derive(Debug)]
#[must_use = "the worker is deregistered when the guard is dropped"]
pub struct WorkerGuard {
    inner: Arc<Inner>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let remaining = {
            let mut state = self.inner.lock();
            state.active -= 1;
            state.active
        };
        tracing::debug!(active = remaining, "Worker deregistered");
        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkerSet, WorkerSetClosed};
    use std::time::Duration;

    #[tokio::test]
    async fn wait_on_empty_set_completes() {
        let workers = WorkerSet::new();
        tokio::time::timeout(Duration::from_millis(100), workers.wait())
            .await
            .unwrap();
    }

    #[test]
    fn guards_are_counted() {
        let workers = WorkerSet::new();
        let a = workers.register().unwrap();
        let b = workers.register().unwrap();
        assert_eq!(2, workers.active());
        drop(a);
        assert_eq!(1, workers.active());
        drop(b);
        assert_eq!(0, workers.active());
    }

    #[test]
    fn closed_set_refuses_registration() {
        let workers = WorkerSet::new();
        let guard = workers.register().unwrap();
        workers.close();
        assert!(workers.is_closed());
        assert_eq!(WorkerSetClosed, workers.register().unwrap_err());
        assert_eq!(1, workers.active());
        drop(guard);
        assert_eq!(0, workers.active());
    }

    #[tokio::test]
    async fn wait_blocks_until_last_worker_completes() {
        let workers = WorkerSet::new();
        let first = workers.register().unwrap();
        let second = workers.register().unwrap();

        let waiter = {
            let workers = workers.clone();
            tokio::spawn(async move { workers.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait did not complete")
            .unwrap();
    }

    #[tokio::test]
    async fn panicking_worker_is_deregistered() {
        let workers = WorkerSet::new();
        let guard = workers.register().unwrap();
        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("worker failed");
        });
        assert!(task.await.is_err());
        assert_eq!(0, workers.active());
        tokio::time::timeout(Duration::from_millis(100), workers.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn many_waiters_are_released() {
        let workers = WorkerSet::new();
        let guard = workers.register().unwrap();
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let workers = workers.clone();
                tokio::spawn(async move { workers.wait().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(guard);
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
