//! The service endpoints, one module per feature.

pub mod health {
    pub mod health_api;
}
pub mod info {
    pub mod info_api;
}
