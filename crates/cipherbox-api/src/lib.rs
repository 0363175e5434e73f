//! # cipherbox-api
//!
//! HTTP API layer for CipherBox built on Axum.
//!
//! Provides the auth and file endpoints, the bearer-token extractors, the
//! CORS, logging and timeout middleware, DTOs, error mapping, and the
//! wiring that turns an [`AppConfig`](cipherbox_core::config::AppConfig)
//! into a running server.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{Collaborators, assemble_state, build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
