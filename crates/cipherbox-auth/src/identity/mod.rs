//! Identity provider implementations.

pub mod firebase;
pub mod memory;

pub use firebase::FirebaseIdentityProvider;
pub use memory::MemoryIdentityProvider;
