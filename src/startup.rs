//! Process startup.
//!
//! Configuration is loaded first, then the database is opened, then the
//! server is started. A failure at any step ends startup before the next
//! one begins, so a missing variable never opens a connection and a failed
//! connection never starts a worker.

use crate::{
    infra::{
        config::{Config, ConfigError},
        database::DbPool,
    },
    lifecycle::Lifecycle,
    server::{self, ServerError},
};
use std::future::Future;

/// Errors that end startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    /// The database could not be opened.
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),
    /// The server could not be started.
    #[error("failed to start server: {0}")]
    Server(#[from] ServerError),
}

/// Starts the service and runs it until `termination` completes.
///
/// `load` reads the configuration and `connect` opens the database from the
/// configured connection string. If the server fails to start after the
/// database was opened, the database is still closed before returning.
pub async fn launch<L, C, Fut, T>(
    lifecycle: Lifecycle,
    load: L,
    connect: C,
    termination: T,
) -> Result<(), StartupError>
where
    L: FnOnce() -> Result<Config, ConfigError>,
    C: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<DbPool, sqlx::Error>>,
    T: Future<Output = ()> + Send + 'static,
{
    let config = load().inspect_err(|e| tracing::error!("{}, exiting", e))?;

    let db = connect(config.postgres_url)
        .await
        .inspect_err(|e| tracing::error!("Failed to connect to DB ({}), exiting", e))?;

    let started = server::start(
        lifecycle.shutdown().clone(),
        lifecycle.workers(),
        config.port,
        db.clone(),
    )
    .await;
    if let Err(e) = started {
        tracing::error!("Failed to start server ({}), exiting", e);
        lifecycle.request_shutdown();
        lifecycle.run(std::future::ready(()), db).await;
        return Err(e.into());
    }

    lifecycle.run(termination, db).await;
    Ok(())
}
