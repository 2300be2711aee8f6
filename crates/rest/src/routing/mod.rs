//! Route configuration.
//!
//! Maps HTTP paths to handlers.

pub mod routes;

pub use routes::create_routes;
