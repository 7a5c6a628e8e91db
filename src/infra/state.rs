//! Global application state.
//!
//! Used for access to common resources such as the
//! database pool or the process-wide cancellation signal.

use super::{database::DbPool, shutdown::Shutdown};
use axum::extract::FromRef;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    db: DbPool,
    shutdown: Shutdown,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(db: DbPool, shutdown: Shutdown) -> Self {
        Self { db, shutdown }
    }
}
