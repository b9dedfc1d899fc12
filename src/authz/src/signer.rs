//! Client-side HMAC request signing
//!
//! Produces the `Authorization` value accepted by
//! [`HmacStrategy`](crate::strategy::HmacStrategy). The key id and secret
//! come from configuration (`hmac.id`, `hmac.key`); when either is absent
//! there is no signer.

use crate::error::Result;
use crate::strategy::hmac::{compute_signature, string_to_sign, DEFAULT_SCHEME};
use axum::http::Method;
use chrono::Utc;
use gatehouse_core::{HostConfig, SigningSecret};
use tracing::debug;

/// Signs outgoing requests on behalf of a service identity
#[derive(Debug, Clone)]
pub struct HmacSigner {
    scheme: String,
    key_id: String,
    secret: SigningSecret,
}

/// Request fields covered by the signature
#[derive(Debug, Clone, Default)]
pub struct SignableRequest<'a> {
    pub content_md5: &'a str,
    pub content_type: &'a str,
}

impl HmacSigner {
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            key_id: key_id.into(),
            secret: SigningSecret::new(secret),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Build from `hmac.id`, `hmac.key`, and optional `hmac.scheme`
    pub fn from_config(config: &dyn HostConfig) -> Option<Self> {
        let (Some(key_id), Some(secret)) = (config.get_str("hmac.id"), config.get_str("hmac.key"))
        else {
            debug!("No HMAC signing key configured");
            return None;
        };

        let signer = Self::new(key_id, secret);
        Some(match config.get_str("hmac.scheme") {
            Some(scheme) if !scheme.is_empty() => signer.with_scheme(scheme),
            _ => signer,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// `Authorization` header value for a request sent at `date`
    pub fn sign(
        &self,
        method: &Method,
        path: &str,
        request: &SignableRequest<'_>,
        date: &str,
    ) -> Result<String> {
        let message = string_to_sign(method, request.content_md5, request.content_type, date, path);
        let signature = compute_signature(self.secret.as_bytes(), &message)?;
        Ok(format!("{} {}:{}:{}", self.scheme, self.key_id, signature, date))
    }

    /// Sign with the current time as an RFC 2822 date
    pub fn sign_now(&self, method: &Method, path: &str, request: &SignableRequest<'_>) -> Result<String> {
        self.sign(method, path, request, &Utc::now().to_rfc2822())
    }
}
