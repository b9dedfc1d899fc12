//! Binds API descriptions to an axum router
//!
//! Security definitions become registered strategies, and every operation
//! carrying `x-security` becomes a [`BoundRoute`] enforced by the
//! [`SecurityGuard`] layer.

use crate::description::{ApiDescription, DescriptionSet, SecurityDefinition};
use crate::error::{AuthError, Result};
use crate::guard::{enforce, BoundRoute, RouteTable, SecurityGuard};
use crate::strategy::{StrategyRegistry, Verifier};
use axum::{middleware, Router};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

fn path_param() -> &'static Regex {
    static PATH_PARAM: OnceLock<Regex> = OnceLock::new();
    PATH_PARAM.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("path parameter pattern is valid"))
}

/// Convert description path syntax (`{id}`) to router syntax (`:id`)
pub fn to_router_path(path: &str) -> String {
    path_param().replace_all(path, ":$1").into_owned()
}

/// Verification functions addressable as `service.method`
#[derive(Default, Clone)]
pub struct VerifierCatalog {
    services: HashMap<String, HashMap<String, Arc<dyn Verifier>>>,
}

impl VerifierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: &str, method: &str, verifier: Arc<dyn Verifier>) -> Self {
        self.insert(service, method, verifier);
        self
    }

    pub fn insert(&mut self, service: &str, method: &str, verifier: Arc<dyn Verifier>) {
        self.services
            .entry(service.to_string())
            .or_default()
            .insert(method.to_string(), verifier);
    }

    /// Look up `service.method`, warning about whichever part is missing
    pub fn resolve(&self, reference: &str) -> Option<Arc<dyn Verifier>> {
        let Some((service, method)) = reference.split_once('.') else {
            warn!(method = %reference, "Verification method must be named as service.method");
            return None;
        };

        let Some(methods) = self.services.get(service) else {
            warn!(service = %service, "Could not find verification service");
            return None;
        };

        let verifier = methods.get(method).cloned();
        if verifier.is_none() {
            warn!(service = %service, method = %method, "Verification function is missing");
        }
        verifier
    }
}

/// Registers strategies and guards routes described by API descriptions
pub struct RouteBinder {
    registry: Arc<StrategyRegistry>,
    verifiers: VerifierCatalog,
    guard: Arc<SecurityGuard>,
}

impl RouteBinder {
    pub fn new(registry: Arc<StrategyRegistry>, verifiers: VerifierCatalog) -> Self {
        let guard = Arc::new(SecurityGuard::new(registry.clone()));
        Self {
            registry,
            verifiers,
            guard,
        }
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    pub fn guard(&self) -> &Arc<SecurityGuard> {
        &self.guard
    }

    /// Register every security definition not registered yet
    ///
    /// Returns the number of strategies newly registered.
    pub fn register_definitions(&self, descriptions: &DescriptionSet) -> usize {
        descriptions
            .iter()
            .flat_map(|(_, api)| api.security_definitions.iter())
            .filter(|(id, definition)| self.register_definition(id, definition))
            .count()
    }

    fn register_definition(&self, id: &str, definition: &SecurityDefinition) -> bool {
        if self.registry.contains(id) {
            debug!(strategy = %id, "Security definition is already registered, skipping");
            return false;
        }

        let Some(reference) = definition.method.as_deref() else {
            warn!(strategy = %id, "Security definition names no verification method");
            return false;
        };
        let Some(verifier) = self.verifiers.resolve(reference) else {
            return false;
        };

        match self
            .registry
            .register(id, &definition.kind, verifier, definition.options.clone())
        {
            Ok(()) => {
                info!(strategy = %id, kind = %definition.kind, "Registered strategy");
                true
            }
            Err(AuthError::RegistrationConflict(_)) => false,
            Err(e) => {
                warn!(
                    strategy = %id,
                    error = %e,
                    "Strategy not registered; routes requiring it will be rejected"
                );
                false
            }
        }
    }

    /// Bound routes for every secured operation
    pub fn route_table(&self, descriptions: &DescriptionSet) -> Result<RouteTable> {
        let mut table = RouteTable::new();
        for (name, api) in descriptions {
            debug!(api = %name, "Installing security for API");
            bind_description(&mut table, name, api)?;
        }

        for route in table.routes() {
            for realm in route.requirement().keys() {
                if !self.registry.contains(realm) {
                    warn!(
                        strategy = %realm,
                        method = %route.method(),
                        route = %route.path(),
                        "Route requires an unregistered strategy and will reject every request"
                    );
                }
            }
        }

        Ok(table)
    }

    /// Register strategies, bind secured routes, and layer the guard onto
    /// `router`
    ///
    /// Routes added to the router after this call are not guarded.
    pub fn bind_routes<S>(&self, router: Router<S>, descriptions: &DescriptionSet) -> Result<Router<S>>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.reload(descriptions)?;
        Ok(router.layer(middleware::from_fn_with_state(self.guard.clone(), enforce)))
    }

    /// Re-read descriptions into an already layered guard
    ///
    /// Previously registered strategies keep their original options.
    pub fn reload(&self, descriptions: &DescriptionSet) -> Result<()> {
        self.register_definitions(descriptions);
        let table = self.route_table(descriptions)?;
        info!(routes = table.len(), strategies = self.registry.len(), "Bound secured routes");
        self.guard.install(table);
        Ok(())
    }
}

fn bind_description(table: &mut RouteTable, name: &str, api: &ApiDescription) -> Result<()> {
    let base_path = api.base_path().trim_end_matches('/');

    for (path, item) in &api.paths {
        if !path.starts_with('/') {
            return Err(AuthError::InvalidDescription(format!(
                "{}: path {} must start with '/'",
                name, path
            )));
        }

        let route = format!("{}{}", base_path, to_router_path(path));
        for (method, operation) in item.operations() {
            let Some(requirement) = &operation.security else {
                continue;
            };

            debug!(
                method = %method,
                route = %route,
                realms = ?requirement.keys().collect::<Vec<_>>(),
                "Applying security requirements"
            );
            table.push(BoundRoute::new(method, route.clone(), requirement.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{verify_fn, Credentials};
    use axum::http::Method;
    use gatehouse_core::Identity;
    use serde_json::json;

    fn verifier() -> Arc<dyn Verifier> {
        verify_fn(|credentials| async move {
            match credentials {
                Credentials::Named { name, .. } => Ok(Identity::new(name.clone(), name)
                    .ok()
                    .map(|identity| identity.with_enabled(true))),
                Credentials::KeyId(_) => Ok(None),
            }
        })
    }

    fn catalog() -> VerifierCatalog {
        VerifierCatalog::new().with("apiUserService", "getWebUserByName", verifier())
    }

    fn descriptions(value: serde_json::Value) -> DescriptionSet {
        let mut set = DescriptionSet::new();
        set.insert("quotes".into(), serde_json::from_value(value).unwrap());
        set
    }

    #[test]
    fn test_to_router_path() {
        assert_eq!(
            to_router_path("/policies/{policyid}/claims/{claimid}"),
            "/policies/:policyid/claims/:claimid"
        );
        assert_eq!(to_router_path("/quotes"), "/quotes");
    }

    #[test]
    fn test_catalog_resolution() {
        let catalog = catalog();
        assert!(catalog.resolve("apiUserService.getWebUserByName").is_some());
        assert!(catalog.resolve("apiUserService.missing").is_none());
        assert!(catalog.resolve("otherService.getWebUserByName").is_none());
        assert!(catalog.resolve("noDot").is_none());
    }

    #[test]
    fn test_route_table_from_description() {
        let binder = RouteBinder::new(Arc::new(StrategyRegistry::new()), catalog());
        let set = descriptions(json!({
            "swagger": "2.0",
            "basePath": "/api/v1/",
            "x-securityDefinitions": {
                "anon_auth": { "type": "anon", "method": "apiUserService.getWebUserByName" }
            },
            "paths": {
                "/quotes/{quoteid}": {
                    "get": { "x-security": { "anon_auth": ["quote:read:{quoteid}"] } },
                    "post": {}
                }
            }
        }));

        assert_eq!(binder.register_definitions(&set), 1);
        let table = binder.route_table(&set).unwrap();

        assert_eq!(table.len(), 1);
        let route = table.find(&Method::GET, "/api/v1/quotes/7").unwrap();
        assert_eq!(route.path(), "/api/v1/quotes/:quoteid");
        assert!(table.find(&Method::POST, "/api/v1/quotes/7").is_none());
    }

    #[test]
    fn test_duplicate_definitions_registered_once() {
        let binder = RouteBinder::new(Arc::new(StrategyRegistry::new()), catalog());
        let definition = json!({
            "swagger": "2.0",
            "x-securityDefinitions": {
                "anon_auth": { "type": "anon", "method": "apiUserService.getWebUserByName" }
            }
        });

        let mut set = descriptions(definition.clone());
        set.insert("claims".into(), serde_json::from_value(definition).unwrap());

        assert_eq!(binder.register_definitions(&set), 1);
        assert_eq!(binder.register_definitions(&set), 0);
        assert_eq!(binder.registry().len(), 1);
    }

    #[test]
    fn test_unsupported_and_unresolved_definitions_skipped() {
        let binder = RouteBinder::new(Arc::new(StrategyRegistry::new()), catalog());
        let set = descriptions(json!({
            "swagger": "2.0",
            "x-securityDefinitions": {
                "jwt_auth": { "type": "jwt", "method": "apiUserService.getWebUserByName" },
                "lost_auth": { "type": "anon", "method": "nowhere.verify" },
                "bare_auth": { "type": "anon" }
            }
        }));

        assert_eq!(binder.register_definitions(&set), 0);
        assert!(binder.registry().is_empty());
    }

    #[test]
    fn test_relative_path_is_invalid() {
        let binder = RouteBinder::new(Arc::new(StrategyRegistry::new()), catalog());
        let set = descriptions(json!({
            "swagger": "2.0",
            "paths": { "quotes": { "get": { "x-security": {} } } }
        }));

        assert!(matches!(
            binder.route_table(&set),
            Err(AuthError::InvalidDescription(_))
        ));
    }
}
