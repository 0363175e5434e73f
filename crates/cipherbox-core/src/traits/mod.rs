//! Collaborator traits defined in `cipherbox-core` and implemented by other crates.

pub mod blob_store;
pub mod identity;
pub mod session_store;
pub mod user_directory;

pub use blob_store::BlobStore;
pub use identity::IdentityProvider;
pub use session_store::SessionStore;
pub use user_directory::UserDirectory;
