//! OpenAPI configuration.

use crate::feature::{health::health_api, info::info_api};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    paths(info_api::info, health_api::health),
    components(
        schemas(
            info_api::AppInfo,
            health_api::Health,
            crate::infra::error::ErrorBody
        )
    )
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;
