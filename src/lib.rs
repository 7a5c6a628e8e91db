//! The Services Domain API.
//!
//! A web service that reads its configuration from the environment, connects
//! to PostgreSQL, serves an HTTP API and shuts down gracefully on SIGINT or
//! SIGTERM. See [`lifecycle`] for the shutdown protocol.

pub mod feature;
pub mod infra;
pub mod lifecycle;
pub mod server;
pub mod startup;
