//! Health check used by load balancers and orchestrators.
//!
//! Reports unavailable as soon as shutdown begins so traffic is routed
//! elsewhere while in-flight requests drain.

use crate::infra::{
    database::DbPool,
    error::{ApiResult, InternalError},
    shutdown::Shutdown,
    state::AppState,
};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

/// The health API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Service health.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Health {
    /// Always `ok` when returned with a success status.
    #[schema(example = "ok")]
    pub status: String,
}

/// Checks that the service is running and can reach the database.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Healthy", body = Health),
        (status = 502, description = "Database unreachable", body = crate::infra::error::ErrorBody),
        (status = 503, description = "Shutting down", body = crate::infra::error::ErrorBody),
    )
)]
#[instrument(skip_all)]
pub async fn health(
    State(db): State<DbPool>,
    State(shutdown): State<Shutdown>,
) -> ApiResult<Json<Health>> {
    if shutdown.is_triggered() {
        return Err(InternalError::ShuttingDown.into());
    }
    sqlx::query("SELECT 1").execute(&db).await?;
    Ok(Json(Health {
        status: "ok".to_string(),
    }))
}
