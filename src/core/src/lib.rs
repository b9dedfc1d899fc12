//! # Gatehouse Core
//!
//! Shared identity model, collaborator traits, and error handling for the
//! gatehouse authentication layer. The authorization crate and host
//! applications both depend on this package so that store and cache
//! adapters can be written without pulling in the HTTP stack.

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    AlternateMapping, Capability, Identity, IdentityRecord, RecordAuthentication, Session,
    SessionData, SigningSecret,
};
pub use traits::{CacheBackend, ChangeEvent, ChangeStream, HostConfig, IdentityStore};

/// Canonical identifier assigned by the identity store
pub type CanonicalId = String;
