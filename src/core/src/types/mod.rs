//! Shared types for the gatehouse identity model

pub mod identity;
pub mod record;
pub mod session;

// Re-export commonly used types
pub use identity::{AlternateMapping, Capability, Identity, SigningSecret};
pub use record::{IdentityRecord, RecordAuthentication};
pub use session::{Session, SessionData};
