//! Anonymous strategy
//!
//! Every request is authenticated as one well-known identity (by default
//! `anonymous`), looked up through the verifier together with the request's
//! session so runtime permissions survive across requests.

use super::{AuthOutcome, Credentials, RequestContext, Strategy, StrategyKind, Verifier};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Identity name used when the `name` option is absent
pub const DEFAULT_ANONYMOUS_NAME: &str = "anonymous";

pub struct AnonymousStrategy {
    name: String,
    verifier: Arc<dyn Verifier>,
}

impl AnonymousStrategy {
    pub fn new(name: impl Into<String>, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            name: name.into(),
            verifier,
        }
    }

    /// Build from strategy options, reading `name`
    pub fn from_options(options: &Map<String, Value>, verifier: Arc<dyn Verifier>) -> Self {
        let name = options
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ANONYMOUS_NAME);
        Self::new(name, verifier)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Strategy for AnonymousStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Anonymous
    }

    async fn authenticate(&self, request: &RequestContext) -> AuthOutcome {
        let credentials = Credentials::Named {
            name: self.name.clone(),
            session: request.session.clone(),
        };

        match self.verifier.verify(&credentials).await {
            Ok(Some(identity)) => AuthOutcome::Success(identity),
            Ok(None) => AuthOutcome::fail(format!("no identity named {}", self.name)),
            Err(e) => AuthOutcome::Error(e),
        }
    }
}
