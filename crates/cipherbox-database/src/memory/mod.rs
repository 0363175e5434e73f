//! In-process stores for tests and local development.

pub mod session;
pub mod user;

pub use session::MemorySessionStore;
pub use user::MemoryUserDirectory;
