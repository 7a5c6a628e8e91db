//! The HTTP server.
//!
//! The server runs as a tracked worker: it registers with a [`WorkerSet`]
//! when started and deregisters once it has drained its connections after
//! the [`Shutdown`] signal.

use crate::feature::{health::health_api, info::info_api};
use crate::infra::{
    database::DbPool,
    error::{ClientError, InternalError, PanicHandler},
    middleware::MakeRequestIdSpan,
    openapi::ApiDoc,
    shutdown::Shutdown,
    state::AppState,
    workers::{WorkerSet, WorkerSetClosed},
};
use axum::{error_handling::HandleErrorLayer, response::IntoResponse, routing::get, Json, Router};
use http::header::AUTHORIZATION;
use std::{
    iter,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;

/// Errors from starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Shutdown has already begun.
    #[error("cannot start server: {0}")]
    Closed(#[from] WorkerSetClosed),
    /// The port could not be bound.
    #[error("failed to bind port {port}: {source}")]
    Bind {
        /// The requested port.
        port: u16,
        /// The underlying error.
        source: std::io::Error,
    },
}

/// Constructs the REST API.
pub fn api(state: AppState) -> Router {
    Router::new()
        .route("/openapi.json", get(openapi))
        .merge(info_api::routes())
        .merge(health_api::routes())
        .with_state(state)
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Constructs the full axum application.
pub fn app(state: AppState) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e| async move {
            InternalError::Other(format!("Tower middleware failed: {e}")).into_response()
        }))
        .concurrency_limit(500);

    Router::new()
        .nest("/api", api(state))
        .fallback(|| async { ClientError::NotFound })
        // Layers
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(iter::once(
            AUTHORIZATION,
        )))
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Serves the application until `shutdown` is triggered
/// and all open connections have finished.
pub async fn run_app(
    listener: TcpListener,
    state: AppState,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    let app = app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Starts the server as a tracked worker on all interfaces.
///
/// Returns once the port is bound, with the address the server listens on.
/// Errors while serving are logged by the server task itself.
pub async fn start(
    shutdown: Shutdown,
    workers: &WorkerSet,
    port: u16,
    db: DbPool,
) -> Result<SocketAddr, ServerError> {
    let guard = workers.register()?;
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map_err(|source| ServerError::Bind { port, source })?;
    let addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { port, source })?;

    tracing::info!("Starting Services Domain API on {}", addr);
    let state = AppState::new(db, shutdown.clone());
    tokio::spawn(async move {
        let _guard = guard;
        match run_app(listener, state, shutdown).await {
            Ok(()) => tracing::info!("Server stopped"),
            Err(e) => tracing::error!("Server failed: {}", e),
        }
    });

    Ok(addr)
}
