//! # Gatehouse Authorization
//!
//! Authentication and authorization for HTTP APIs described by Swagger
//! documents.
//!
//! ## Features
//!
//! - **Pluggable strategies** registered by id (HMAC signed requests, anonymous)
//! - **Route binding** from `x-securityDefinitions` / `x-security` metadata
//! - **Instance-scoped permissions** with wildcard matching (`claim:read:{claimid}`)
//! - **Identity caching** with TTL and change-feed invalidation
//!
//! ## Example
//!
//! ```rust,no_run
//! use gatehouse_authz::{RouteBinder, StrategyRegistry, VerifierCatalog};
//! use gatehouse_authz::description::load_dir;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptions = load_dir("swagger".as_ref())?;
//! let binder = RouteBinder::new(Arc::new(StrategyRegistry::new()), VerifierCatalog::new());
//!
//! let router: axum::Router = axum::Router::new();
//! let router = binder.bind_routes(router, &descriptions)?;
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod cache;
pub mod config;
pub mod description;
pub mod error;
pub mod guard;
pub mod permission;
pub mod resolver;
pub mod signer;
pub mod store;
pub mod strategy;

// Re-export commonly used types
pub use binder::{to_router_path, RouteBinder, VerifierCatalog};
pub use cache::{IdentityCache, MemoryCacheBackend};
pub use config::{ConfigTree, GatehouseConfig};
pub use description::{ApiDescription, DescriptionProvider, DescriptionSet};
pub use error::{AuthError, Result};
pub use guard::{AuthenticatedIdentity, SecurityGuard, Verdict};
pub use permission::{Decision, Permission, PermissionEvaluator, SecurityRequirement};
pub use resolver::{IdentityResolver, LookupIndex, ResolverConfig};
pub use signer::HmacSigner;
pub use store::MemoryIdentityStore;
pub use strategy::{
    verify_fn, AuthOutcome, Credentials, RequestContext, Strategy, StrategyKind,
    StrategyRegistry, Verifier,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
