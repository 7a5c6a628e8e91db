//! Process lifecycle coordination.
//!
//! ```text
//! Starting ──▶ Running ──▶ ShuttingDown ──▶ Terminated
//!              │           │                │
//!              │           │                └ persistence closed
//!              │           └ workers closed, signal triggered, join
//!              └ termination listener armed
//! ```
//!
//! Shutdown is two-phase: the cancellation signal is triggered first, then
//! the coordinator waits for every registered worker to deregister. Only after
//! that is the shared persistence handle closed, so no worker can observe a
//! closed handle. Cancellation is cooperative and there is no timeout: a
//! worker that never stops blocks shutdown.

use crate::infra::{database::Persistence, shutdown::Shutdown, workers::WorkerSet};
use std::{future::Future, sync::Arc};
use tokio::sync::watch;

/// The coordinator's current phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Resources are being acquired and workers started.
    Starting,
    /// Workers are serving and the termination listener is armed.
    Running,
    /// Cancellation was requested; waiting for workers to finish.
    ShuttingDown,
    /// All workers finished and the persistence handle was released.
    Terminated,
}

#[derive(Debug)]
struct Inner {
    shutdown: Shutdown,
    workers: WorkerSet,
    state: watch::Sender<LifecycleState>,
}

/// Owns the cancellation signal and the worker set for the process.
///
/// Cloning gives another handle to the same coordinator.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Constructs a new coordinator in the [`LifecycleState::Starting`] state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            inner: Arc::new(Inner {
                shutdown: Shutdown::new(),
                workers: WorkerSet::new(),
                state,
            }),
        }
    }

    /// The signal every worker should observe.
    pub fn shutdown(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// The set every worker should register with.
    pub fn workers(&self) -> &WorkerSet {
        &self.inner.workers
    }

    /// The current phase.
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Follow phase changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Begins shutdown.
    ///
    /// Closes the worker set to new registrations and triggers the
    /// cancellation signal. Returns `true` only for the call that actually
    /// started the shutdown.
    pub fn request_shutdown(&self) -> bool {
        self.inner.workers.close();
        if !self.inner.shutdown.trigger() {
            return false;
        }
        self.inner.state.send_if_modified(|state| {
            if *state == LifecycleState::Terminated {
                return false;
            }
            *state = LifecycleState::ShuttingDown;
            true
        });
        true
    }

    /// Runs the process until `termination` completes, then shuts down.
    ///
    /// `termination` is polled on its own task, concurrently with the
    /// workers. Once it completes, or once every worker has stopped on its
    /// own, cancellation is requested and this waits for all workers before
    /// closing `persistence`. A failure to close is logged and otherwise
    /// ignored.
    pub async fn run<F, P>(self, termination: F, persistence: P)
    where
        F: Future<Output = ()> + Send + 'static,
        P: Persistence,
    {
        self.inner.state.send_if_modified(|state| {
            if *state != LifecycleState::Starting {
                return false;
            }
            *state = LifecycleState::Running;
            true
        });
        tracing::info!(workers = self.workers().active(), "Running");

        let listener = {
            let lifecycle = self.clone();
            tokio::spawn(async move {
                termination.await;
                if lifecycle.request_shutdown() {
                    tracing::info!("Received shutdown signal, beginning shutdown");
                }
            })
        };

        tokio::select! {
            _ = self.shutdown().cancelled() => {}
            _ = self.workers().wait() => {
                if self.request_shutdown() {
                    tracing::warn!("All workers stopped before a shutdown signal, beginning shutdown");
                }
            }
        }

        // Block until every worker has deregistered.
        self.workers().wait().await;
        listener.abort();
        tracing::info!("All workers stopped");

        if let Err(e) = persistence.close().await {
            tracing::error!("Failed to close DB connection ({})", e);
        }

        self.inner.state.send_replace(LifecycleState::Terminated);
        tracing::info!("Gracefully shutdown");
    }
}
