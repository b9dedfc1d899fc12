//! Collaborator traits consumed by the gatehouse core
//!
//! Hosts implement these against their real lookup store, cache service,
//! and configuration source.

pub mod store;
pub mod cache;
pub mod config;

// Re-export commonly used traits
pub use store::{ChangeEvent, ChangeStream, IdentityStore};
pub use cache::CacheBackend;
pub use config::HostConfig;
