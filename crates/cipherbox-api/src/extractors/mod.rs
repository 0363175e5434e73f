//! Custom Axum extractors.

pub mod auth;

pub use auth::{AuthUser, BearerToken};
