//! Cancellation signal and termination listener.
//!
//! A [`Shutdown`] is handed to every long-running worker. Workers await
//! [`Shutdown::cancelled`] and stop what they are doing once it completes.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio_util::sync::CancellationToken;

/// A broadcast-once cancellation signal.
///
/// Cloning is cheap and every clone observes the same signal.
/// Once triggered it stays triggered.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Constructs a new, active [`Shutdown`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the signal.
    ///
    /// Returns `true` for the one call that moved the signal from active to
    /// cancelled, `false` for every later call.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Whether the signal has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal has been triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Completes when the process receives an interrupt or terminate request.
///
/// Both requests are treated the same way. If a handler cannot be installed
/// the error is logged and only the other request is listened for.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl_c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received interrupt request"),
        _ = terminate => tracing::info!("Received terminate request"),
    }
}
