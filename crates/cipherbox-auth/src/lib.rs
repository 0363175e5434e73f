//! # cipherbox-auth
//!
//! Authentication for CipherBox.
//!
//! ## Modules
//!
//! - `jwt`: signed access/refresh token issuing and verification
//! - `session`: refresh-token rotation with reuse detection
//! - `gate`: stateless access-token check for protected calls
//! - `validation`: signup email/password rules
//! - `identity`: identity providers (Firebase REST, in-memory)
//! - `password`: Argon2id hashing for the in-memory provider

pub mod gate;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;
pub mod validation;

pub use gate::AuthGate;
pub use identity::{FirebaseIdentityProvider, MemoryIdentityProvider};
pub use jwt::{AccessClaims, JwtDecoder, JwtEncoder, RefreshClaims, TokenPair};
pub use password::PasswordHasher;
pub use session::SessionManager;
pub use validation::{ValidatedEmail, ValidatedPassword};
