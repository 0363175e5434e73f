//! Account signup and login orchestration.

pub mod service;

pub use service::{AccountService, EmailCheck, SignupOutcome, SignupRequest};
