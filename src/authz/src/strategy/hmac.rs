//! HMAC signed-request strategy
//!
//! Callers send
//!
//! ```text
//! Authorization: SFI <keyId>:<base64 signature>:<date>
//! ```
//!
//! where the signature is HMAC-SHA256 over
//! `METHOD\nContent-MD5\nContent-Type\ndate\npath` keyed with the service
//! identity's signing secret.

use super::{AuthOutcome, Credentials, RequestContext, Strategy, StrategyKind, Verifier};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use axum::http::{header, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Authorization scheme used when none is configured
pub const DEFAULT_SCHEME: &str = "SFI";

/// Header carrying the body digest
pub const CONTENT_MD5: &str = "content-md5";

/// Message covered by the signature
pub fn string_to_sign(
    method: &Method,
    content_md5: &str,
    content_type: &str,
    date: &str,
    path: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method.as_str().to_uppercase(),
        content_md5,
        content_type,
        date,
        path
    )
}

/// Base64 HMAC-SHA256 of `message`
pub fn compute_signature(secret: &[u8], message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::Configuration(format!("invalid signing key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a base64 signature
pub fn verify_signature(secret: &[u8], message: &str, signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Parsed `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCredentials {
    pub key_id: String,
    pub signature: String,
    pub date: String,
}

/// Parse `<scheme> <keyId>:<signature>:<date>`
///
/// The date may itself contain colons, so only the first two separate
/// fields.
pub fn parse_authorization(value: &str, scheme: &str) -> Option<SignedCredentials> {
    let (found, rest) = value.trim().split_once(' ')?;
    if found != scheme {
        return None;
    }

    let mut parts = rest.trim().splitn(3, ':');
    let key_id = parts.next()?;
    let signature = parts.next()?;
    let date = parts.next()?;

    if key_id.is_empty() || signature.is_empty() || date.is_empty() {
        return None;
    }

    Some(SignedCredentials {
        key_id: key_id.to_string(),
        signature: signature.to_string(),
        date: date.to_string(),
    })
}

/// Strategy options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacOptions {
    /// Authorization scheme token
    pub scheme: String,

    /// Reject requests whose RFC 2822 date is further than this from now
    pub max_skew: Option<Duration>,
}

impl Default for HmacOptions {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            max_skew: None,
        }
    }
}

impl HmacOptions {
    /// Read `scheme` and `max_skew_secs` from strategy options
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let scheme = match options.get("scheme") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => DEFAULT_SCHEME.to_string(),
            Some(other) => {
                return Err(AuthError::Configuration(format!(
                    "hmac scheme must be a string, got {}",
                    other
                )))
            }
        };

        let max_skew = match options.get("max_skew_secs") {
            None | Some(Value::Null) => None,
            Some(value) => Some(Duration::from_secs(value.as_u64().ok_or_else(|| {
                AuthError::Configuration(format!(
                    "hmac max_skew_secs must be a positive integer, got {}",
                    value
                ))
            })?)),
        };

        Ok(Self { scheme, max_skew })
    }
}

/// Authenticates requests signed with a service identity's secret
pub struct HmacStrategy {
    options: HmacOptions,
    verifier: Arc<dyn Verifier>,
}

impl HmacStrategy {
    pub fn new(options: HmacOptions, verifier: Arc<dyn Verifier>) -> Self {
        Self { options, verifier }
    }

    pub fn options(&self) -> &HmacOptions {
        &self.options
    }

    fn within_skew(&self, date: &str) -> bool {
        let Some(max_skew) = self.options.max_skew else {
            return true;
        };
        let Ok(sent) = DateTime::parse_from_rfc2822(date) else {
            return false;
        };

        let skew = (Utc::now() - sent.with_timezone(&Utc)).num_seconds().unsigned_abs();
        skew <= max_skew.as_secs()
    }
}

#[async_trait]
impl Strategy for HmacStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hmac
    }

    async fn authenticate(&self, request: &RequestContext) -> AuthOutcome {
        let authorization = request.header_str(header::AUTHORIZATION.as_str());
        if authorization.is_empty() {
            return AuthOutcome::fail("missing authorization header");
        }

        let Some(signed) = parse_authorization(authorization, &self.options.scheme) else {
            return AuthOutcome::fail("malformed authorization header");
        };

        if !self.within_skew(&signed.date) {
            return AuthOutcome::fail("request date outside allowed skew");
        }

        let identity = match self
            .verifier
            .verify(&Credentials::KeyId(signed.key_id.clone()))
            .await
        {
            Ok(Some(identity)) => identity,
            Ok(None) => return AuthOutcome::fail("unknown key id"),
            Err(e) => return AuthOutcome::Error(e),
        };

        let Some(secret) = identity.signing_secret() else {
            debug!(key_id = %signed.key_id, "Identity has no signing secret");
            return AuthOutcome::fail("identity cannot sign requests");
        };

        let message = string_to_sign(
            &request.method,
            request.header_str(CONTENT_MD5),
            request.header_str(header::CONTENT_TYPE.as_str()),
            &signed.date,
            &request.path,
        );

        if !verify_signature(secret.as_bytes(), &message, &signed.signature) {
            debug!(key_id = %signed.key_id, "Signature mismatch");
            return AuthOutcome::fail("signature mismatch");
        }

        AuthOutcome::Success(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::verify_fn;
    use axum::http::HeaderValue;
    use gatehouse_core::{Identity, IdentityRecord};
    use serde_json::json;

    const SECRET: &str = "rqwHvMvGLgtKNrgOpksK6rlIdyqZtD1mKVAsFzKJTOg";
    const DATE: &str = "Tue, 15 Nov 1994 08:12:31 +0000";

    fn strategy(options: HmacOptions) -> HmacStrategy {
        let verifier = verify_fn(|credentials| async move {
            let record = IdentityRecord::new("doc-1", "svc", "api-1")
                .with_api_key(SECRET)
                .with_enabled(true);
            match credentials {
                Credentials::KeyId(id) if id == "api-1" => Ok(Identity::service(&record).ok()),
                Credentials::KeyId(id) if id == "no-secret" => Ok(Identity::from_record(&record).ok()),
                _ => Ok(None),
            }
        });
        HmacStrategy::new(options, verifier)
    }

    fn signed_request(key_id: &str, secret: &str, path: &str, date: &str) -> RequestContext {
        let message = string_to_sign(&Method::GET, "", "application/json", date, path);
        let signature = compute_signature(secret.as_bytes(), &message).unwrap();
        let value = format!("SFI {}:{}:{}", key_id, signature, date);

        RequestContext::new(Method::GET, path)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_header(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap())
    }

    #[test]
    fn test_parse_authorization_keeps_date_colons() {
        let parsed = parse_authorization("SFI api-1:c2ln:Tue, 15 Nov 1994 08:12:31 GMT", "SFI").unwrap();
        assert_eq!(parsed.key_id, "api-1");
        assert_eq!(parsed.signature, "c2ln");
        assert_eq!(parsed.date, "Tue, 15 Nov 1994 08:12:31 GMT");
    }

    #[test]
    fn test_parse_authorization_rejects_other_scheme() {
        assert!(parse_authorization("Bearer abc", "SFI").is_none());
        assert!(parse_authorization("SFI api-1:sig", "SFI").is_none());
        assert!(parse_authorization("SFI :sig:date", "SFI").is_none());
    }

    #[test]
    fn test_options() {
        let options = HmacOptions::from_options(&Map::new()).unwrap();
        assert_eq!(options, HmacOptions::default());

        let map = json!({"scheme": "ACME", "max_skew_secs": 300});
        let options = HmacOptions::from_options(map.as_object().unwrap()).unwrap();
        assert_eq!(options.scheme, "ACME");
        assert_eq!(options.max_skew, Some(Duration::from_secs(300)));

        let map = json!({"max_skew_secs": "soon"});
        assert!(HmacOptions::from_options(map.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_signature_round_trip() {
        let message = string_to_sign(&Method::POST, "", "", DATE, "/api/quotes");
        let signature = compute_signature(SECRET.as_bytes(), &message).unwrap();

        assert!(verify_signature(SECRET.as_bytes(), &message, &signature));
        assert!(!verify_signature(b"other", &message, &signature));
        assert!(!verify_signature(SECRET.as_bytes(), &message, "not base64!"));
    }

    #[tokio::test]
    async fn test_valid_signature_authenticates() {
        let outcome = strategy(HmacOptions::default())
            .authenticate(&signed_request("api-1", SECRET, "/api/quotes", DATE))
            .await;

        match outcome {
            AuthOutcome::Success(identity) => assert_eq!(identity.id(), "api-1"),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_secret_fails() {
        let outcome = strategy(HmacOptions::default())
            .authenticate(&signed_request("api-1", "wrong", "/api/quotes", DATE))
            .await;
        assert!(matches!(outcome, AuthOutcome::Fail { .. }));
    }

    #[tokio::test]
    async fn test_tampered_path_fails() {
        let mut request = signed_request("api-1", SECRET, "/api/quotes", DATE);
        request.path = "/api/admin".to_string();

        let outcome = strategy(HmacOptions::default()).authenticate(&request).await;
        assert!(matches!(outcome, AuthOutcome::Fail { .. }));
    }

    #[tokio::test]
    async fn test_unknown_key_and_missing_secret_fail() {
        let strategy = strategy(HmacOptions::default());

        let outcome = strategy
            .authenticate(&signed_request("api-9", SECRET, "/api/quotes", DATE))
            .await;
        assert!(matches!(outcome, AuthOutcome::Fail { .. }));

        let outcome = strategy
            .authenticate(&signed_request("no-secret", SECRET, "/api/quotes", DATE))
            .await;
        assert!(matches!(outcome, AuthOutcome::Fail { .. }));
    }

    #[tokio::test]
    async fn test_missing_header_fails() {
        let outcome = strategy(HmacOptions::default())
            .authenticate(&RequestContext::new(Method::GET, "/api/quotes"))
            .await;
        assert!(matches!(outcome, AuthOutcome::Fail { .. }));
    }

    #[tokio::test]
    async fn test_skew_window() {
        let options = HmacOptions {
            max_skew: Some(Duration::from_secs(300)),
            ..Default::default()
        };
        let strategy = strategy(options);

        let stale = strategy
            .authenticate(&signed_request("api-1", SECRET, "/api/quotes", DATE))
            .await;
        assert!(matches!(stale, AuthOutcome::Fail { .. }));

        let now = Utc::now().to_rfc2822();
        let fresh = strategy
            .authenticate(&signed_request("api-1", SECRET, "/api/quotes", &now))
            .await;
        assert!(matches!(fresh, AuthOutcome::Success(_)));
    }
}
