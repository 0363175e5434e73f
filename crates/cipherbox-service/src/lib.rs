//! # cipherbox-service
//!
//! Use-case layer for CipherBox. [`BlobManager`] owns the encrypted blob
//! lifecycle (upload, download, list, rename, delete) and
//! [`AccountService`] orchestrates signup and login against the identity
//! provider, the user directory, and the session manager.
//!
//! Services follow constructor injection: every collaborator is handed in
//! at construction time behind an `Arc`.

pub mod account;
pub mod context;
pub mod file;

pub use account::{AccountService, EmailCheck, SignupOutcome, SignupRequest};
pub use context::RequestContext;
pub use file::{BlobManager, DownloadedFile};
