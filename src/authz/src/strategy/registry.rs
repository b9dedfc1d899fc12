//! Strategy registry
//!
//! Strategies are registered once per id. The id doubles as the realm that
//! every identity authenticated by the strategy is tagged with, which is the
//! key the permission check uses to select a requirement list.

use super::{AuthOutcome, Credentials, RequestContext, Strategy, StrategyKind, Verifier};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gatehouse_core::{HostConfig, Identity};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"^\{\{(.*)\}\}$").expect("placeholder pattern is valid"))
}

/// Verifier wrapper that tags successful results with a realm
pub struct RealmVerifier {
    realm: String,
    inner: Arc<dyn Verifier>,
}

impl RealmVerifier {
    pub fn new(realm: impl Into<String>, inner: Arc<dyn Verifier>) -> Self {
        Self {
            realm: realm.into(),
            inner,
        }
    }
}

#[async_trait]
impl Verifier for RealmVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        let mut identity = self.inner.verify(credentials).await?;
        if let Some(identity) = identity.as_mut() {
            identity.set_realm(self.realm.clone());
        }
        Ok(identity)
    }
}

/// A configured strategy instance
pub struct RegisteredStrategy {
    id: String,
    kind: StrategyKind,
    options: Map<String, Value>,
    strategy: Arc<dyn Strategy>,
}

impl RegisteredStrategy {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Options after placeholder resolution
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub async fn authenticate(&self, request: &RequestContext) -> AuthOutcome {
        self.strategy.authenticate(request).await
    }
}

/// Registered strategies keyed by id
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: DashMap<String, Arc<RegisteredStrategy>>,
    config: Option<Arc<dyn HostConfig>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `{{path}}` option placeholders against `config`
    pub fn with_config(config: Arc<dyn HostConfig>) -> Self {
        Self {
            strategies: DashMap::new(),
            config: Some(config),
        }
    }

    /// Register a strategy under `id`
    ///
    /// Fails without touching the registry when `id` is taken or `kind` is
    /// not supported. The verifier is wrapped so identities it returns carry
    /// `id` as their realm.
    pub fn register(
        &self,
        id: &str,
        kind: &str,
        verifier: Arc<dyn Verifier>,
        options: Map<String, Value>,
    ) -> Result<()> {
        debug!(strategy = %id, kind = %kind, "Registering security definition");

        if self.strategies.contains_key(id) {
            warn!(strategy = %id, "Strategy already registered");
            return Err(AuthError::RegistrationConflict(id.to_string()));
        }

        let kind: StrategyKind = kind.parse().map_err(|e| {
            warn!(strategy = %id, kind = %kind, "Security definition type is not supported");
            e
        })?;

        let options = self.resolve_options(options);
        let verifier: Arc<dyn Verifier> = Arc::new(RealmVerifier::new(id, verifier));
        let strategy = kind.build(&options, verifier)?;

        match self.strategies.entry(id.to_string()) {
            Entry::Occupied(_) => {
                warn!(strategy = %id, "Strategy already registered");
                Err(AuthError::RegistrationConflict(id.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RegisteredStrategy {
                    id: id.to_string(),
                    kind,
                    options,
                    strategy,
                }));
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredStrategy>> {
        self.strategies.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Replace `{{path}}` string values with configuration values.
    /// Unresolvable placeholders become null.
    fn resolve_options(&self, mut options: Map<String, Value>) -> Map<String, Value> {
        for (key, value) in options.iter_mut() {
            let Some(path) = value
                .as_str()
                .and_then(|s| placeholder().captures(s))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|path| !path.is_empty())
            else {
                continue;
            };

            let resolved = self.config.as_ref().and_then(|config| config.get(&path));
            if resolved.is_none() {
                debug!(option = %key, path = %path, "Option placeholder did not resolve");
            }
            *value = resolved.unwrap_or(Value::Null);
        }
        options
    }
}
