//! # cipherbox-core
//!
//! Core crate for CipherBox. Contains the collaborator traits (blob store,
//! session store, user directory, identity provider), configuration
//! schemas, shared value types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other CipherBox crates.

pub mod config;
pub mod deadline;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
