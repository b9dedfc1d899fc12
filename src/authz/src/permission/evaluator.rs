//! Permission evaluation for bound routes

use super::expand::expand_route_instance_permissions;
use super::types::PermissionSet;
use gatehouse_core::Identity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-route mapping from realm (strategy id) to required permissions
///
/// Declaration order is kept; it is also the order strategies are tried in.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Checks an identity's grants against a route's requirement
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `identity` may call `request_path` on `route`
    ///
    /// Disabled identities are always denied. When the requirement has no
    /// permissions for the identity's realm the check allows. Otherwise
    /// route parameters are substituted into the required permissions and
    /// every one of them must be implied by some grant.
    ///
    /// # Arguments
    ///
    /// * `requirement` - Realm to required permissions, possibly templated
    /// * `route` - Route path as registered with the router (`/claims/:id`)
    /// * `identity` - Authenticated caller
    /// * `request_path` - Concrete request path (`/claims/37103`)
    pub fn check(
        &self,
        requirement: &SecurityRequirement,
        route: &str,
        identity: &Identity,
        request_path: &str,
    ) -> Decision {
        if !identity.is_enabled() {
            debug!(identity = %identity.id(), route = %route, "Denied disabled identity");
            return Decision::Deny;
        }

        let required = match identity.realm().and_then(|realm| requirement.get(realm)) {
            Some(required) if !required.is_empty() => required,
            _ => return Decision::Allow,
        };

        let expanded = expand_route_instance_permissions(required, route, request_path);
        let granted = PermissionSet::from_grants(identity.permissions());

        if granted.is_permitted(&expanded) {
            Decision::Allow
        } else {
            debug!(
                identity = %identity.id(),
                realm = ?identity.realm(),
                route = %route,
                "Permission denied"
            );
            Decision::Deny
        }
    }
}
