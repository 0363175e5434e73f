//! Core value types shared across the CipherBox workspace.

pub mod id;
pub mod object;
pub mod profile;
pub mod response;
pub mod session;

pub use id::UserId;
pub use object::{BlobDescriptor, ObjectInfo, ObjectMetadata, StoredObject, META_IV, META_SIZE};
pub use profile::{NewIdentity, UserProfile, VerifiedIdentity};
pub use response::ApiErrorResponse;
pub use session::{RetentionPolicy, RotationOutcome, SessionSet, SessionToken};
