//! Pluggable authentication strategies
//!
//! A strategy extracts credentials from a request and hands them to a
//! host-supplied [`Verifier`], which looks the caller up. Strategies are
//! registered by id in the [`StrategyRegistry`]; the id becomes the realm
//! of every identity the strategy authenticates.

pub mod anonymous;
pub mod hmac;
pub mod registry;

pub use anonymous::AnonymousStrategy;
pub use hmac::{HmacOptions, HmacStrategy};
pub use registry::{RegisteredStrategy, StrategyRegistry};

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method};
use gatehouse_core::{Identity, Session};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

/// Request data visible to strategies
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path without query string
    pub path: String,
    pub headers: HeaderMap,
    /// Session attached by the host's session layer, if any
    pub session: Option<Session>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            session: None,
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            session: parts.extensions.get::<Session>().cloned(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Header value as a string, empty when absent or not valid UTF-8
    pub fn header_str(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

/// Credentials a strategy hands to its verification function
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Key id taken from a signed request
    KeyId(String),

    /// Caller known by name, with the request's session
    Named {
        name: String,
        session: Option<Session>,
    },
}

/// Host-supplied verification function
///
/// `Ok(None)` means the caller is unknown; `Err` means the lookup itself
/// failed.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<Identity>>;
}

/// Adapter turning an async closure into a [`Verifier`]
pub struct FnVerifier<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Verifier for FnVerifier<F>
where
    F: Fn(Credentials) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Identity>>> + Send,
{
    async fn verify(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        (self.f)(credentials.clone()).await
    }
}

/// Wrap a closure as a shared verifier
pub fn verify_fn<F, Fut>(f: F) -> Arc<dyn Verifier>
where
    F: Fn(Credentials) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Identity>>> + Send + 'static,
{
    Arc::new(FnVerifier { f })
}

/// Result of running a strategy against a request
#[derive(Debug)]
pub enum AuthOutcome {
    /// Caller authenticated; the identity carries the strategy's realm
    Success(Identity),

    /// Credentials missing, malformed, or rejected
    Fail { reason: String },

    /// Verification could not be completed
    Error(AuthError),
}

impl AuthOutcome {
    pub fn fail(reason: impl Into<String>) -> Self {
        AuthOutcome::Fail {
            reason: reason.into(),
        }
    }
}

/// Authentication strategy
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn authenticate(&self, request: &RequestContext) -> AuthOutcome;
}

/// Supported strategy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Signed requests, see [`HmacStrategy`]
    Hmac,
    /// Named anonymous caller, see [`AnonymousStrategy`]
    Anonymous,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Hmac => "hmac",
            StrategyKind::Anonymous => "anon",
        }
    }

    /// Construct a strategy of this kind
    pub(crate) fn build(
        self,
        options: &Map<String, Value>,
        verifier: Arc<dyn Verifier>,
    ) -> Result<Arc<dyn Strategy>> {
        Ok(match self {
            StrategyKind::Hmac => Arc::new(HmacStrategy::new(
                HmacOptions::from_options(options)?,
                verifier,
            )),
            StrategyKind::Anonymous => Arc::new(AnonymousStrategy::from_options(options, verifier)),
        })
    }
}

impl FromStr for StrategyKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hmac" => Ok(StrategyKind::Hmac),
            "anon" | "anonymous" => Ok(StrategyKind::Anonymous),
            other => Err(AuthError::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("hmac".parse::<StrategyKind>().unwrap(), StrategyKind::Hmac);
        assert_eq!("anon".parse::<StrategyKind>().unwrap(), StrategyKind::Anonymous);
        assert_eq!("anonymous".parse::<StrategyKind>().unwrap(), StrategyKind::Anonymous);
        assert!(matches!(
            "jwt".parse::<StrategyKind>(),
            Err(AuthError::UnsupportedStrategy(_))
        ));
    }

    #[test]
    fn test_request_context_headers() {
        let ctx = RequestContext::new(Method::GET, "/api/quotes")
            .with_header(AUTHORIZATION, HeaderValue::from_static("SFI a:b:c"));

        assert_eq!(ctx.header_str("authorization"), "SFI a:b:c");
        assert_eq!(ctx.header_str("content-type"), "");
    }

    #[tokio::test]
    async fn test_fn_verifier() {
        let verifier = verify_fn(|credentials| async move {
            match credentials {
                Credentials::KeyId(id) if id == "known" => Ok(Identity::new("known", "Known").ok()),
                _ => Ok(None),
            }
        });

        let found = verifier.verify(&Credentials::KeyId("known".into())).await.unwrap();
        assert_eq!(found.unwrap().id(), "known");

        let missing = verifier.verify(&Credentials::KeyId("other".into())).await.unwrap();
        assert!(missing.is_none());
    }
}
