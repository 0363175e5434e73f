//! Route handlers.

pub mod auth;
pub mod file;
pub mod health;
