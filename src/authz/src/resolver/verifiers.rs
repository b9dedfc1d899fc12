//! Verification functions backed by the identity resolver
//!
//! These are the verifiers a host registers in its
//! [`VerifierCatalog`](crate::binder::VerifierCatalog): one for signed
//! service callers, one for session-bound callers such as `anonymous`.

use super::IdentityResolver;
use crate::error::{AuthError, Result};
use crate::strategy::{Credentials, Verifier};
use async_trait::async_trait;
use gatehouse_core::Identity;
use std::sync::Arc;
use tracing::warn;

/// Resolves key ids to service identities carrying their signing secret
pub struct ServiceIdentityVerifier {
    resolver: Arc<IdentityResolver>,
}

impl ServiceIdentityVerifier {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Verifier for ServiceIdentityVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        let key_id = match credentials {
            Credentials::KeyId(id) => id,
            Credentials::Named { name, .. } => name,
        };

        let Some(record) = self.resolver.resolve_by_alternate_id(key_id).await else {
            return Ok(None);
        };

        Identity::service(&record).map(Some).map_err(|e| {
            warn!(key_id = %key_id, error = %e, "Error encountered building api identity");
            AuthError::Authentication(format!("invalid identity record for {}", key_id))
        })
    }
}

/// Resolves names to identities bound to the request's session
///
/// Without a session a fresh one is created, so runtime permissions last
/// for the request only.
pub struct SessionIdentityVerifier {
    resolver: Arc<IdentityResolver>,
}

impl SessionIdentityVerifier {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Verifier for SessionIdentityVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        let (name, session) = match credentials {
            Credentials::Named { name, session } => (name, session.clone()),
            Credentials::KeyId(id) => (id, None),
        };

        let Some(record) = self.resolver.resolve_by_name(name).await else {
            return Ok(None);
        };

        Identity::session_bound(&record, session.unwrap_or_default())
            .map(Some)
            .map_err(|e| {
                warn!(name = %name, error = %e, "Error encountered building web identity");
                AuthError::Authentication(format!("invalid identity record for {}", name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{IdentityCache, MemoryCacheBackend};
    use crate::resolver::ResolverConfig;
    use crate::store::MemoryIdentityStore;
    use gatehouse_core::{IdentityRecord, Session};

    fn resolver() -> Arc<IdentityResolver> {
        let store = Arc::new(MemoryIdentityStore::with_records(vec![
            IdentityRecord::new("doc-1", "Frank Krank Services", "7e06c4a6")
                .with_api_key("secret")
                .with_enabled(true)
                .with_permission("api:*"),
            IdentityRecord::new("doc-anon", "anonymous", "anonymous")
                .with_enabled(true)
                .with_permission("api:read"),
        ]));
        Arc::new(IdentityResolver::new(
            store,
            IdentityCache::new(Arc::new(MemoryCacheBackend::new())),
            ResolverConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_service_verifier() {
        let verifier = ServiceIdentityVerifier::new(resolver());

        let identity = verifier
            .verify(&Credentials::KeyId("7e06c4a6".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.display_name(), "Frank Krank Services");
        assert!(identity.signing_secret().is_some());

        let missing = verifier.verify(&Credentials::KeyId("nope".into())).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_session_verifier_binds_session() {
        let verifier = SessionIdentityVerifier::new(resolver());
        let session = Session::new();
        session.push_permission("quote:read:7");

        let identity = verifier
            .verify(&Credentials::Named {
                name: "anonymous".into(),
                session: Some(session.clone()),
            })
            .await
            .unwrap()
            .unwrap();

        assert!(identity.session().is_some());
        assert_eq!(
            identity.permissions(),
            &["api:read".to_string(), "quote:read:7".to_string()]
        );
    }

    #[tokio::test]
    async fn test_session_verifier_rejects_empty_id_record() {
        // a record without an apiId cannot form an identity
        let store = Arc::new(MemoryIdentityStore::with_records(vec![IdentityRecord::new(
            "doc-x", "broken", "",
        )]));
        let resolver = Arc::new(IdentityResolver::new(
            store,
            IdentityCache::new(Arc::new(MemoryCacheBackend::new())),
            ResolverConfig::default(),
        ));

        let result = SessionIdentityVerifier::new(resolver)
            .verify(&Credentials::Named {
                name: "broken".into(),
                session: None,
            })
            .await;
        assert!(matches!(result, Err(AuthError::Authentication(_))));
    }
}
