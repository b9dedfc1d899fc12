//! Route security guard
//!
//! One middleware layer guards every bound route:
//! 1. find the bound route for the request's method and path
//! 2. authenticate with the route's strategies, in declaration order,
//!    without establishing a session
//! 3. check the authenticated identity's permissions for its realm
//!
//! Rejections carry no body. A missing or failed authentication is 401, a
//! permission denial or a route naming an unusable strategy is 403.

use crate::permission::{Decision, PermissionEvaluator, SecurityRequirement};
use crate::strategy::{AuthOutcome, RequestContext, StrategyRegistry};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gatehouse_core::Identity;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Identity attached to requests that passed the guard
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity(pub Identity);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.trim_end_matches('/').split('/').skip(1)
}

/// An operation bound to a security requirement
#[derive(Debug, Clone)]
pub struct BoundRoute {
    method: Method,
    path: String,
    requirement: SecurityRequirement,
    segments: Vec<Segment>,
}

impl BoundRoute {
    /// `path` uses router syntax (`/claims/:claimid`)
    pub fn new(method: Method, path: impl Into<String>, requirement: SecurityRequirement) -> Self {
        let path = path.into();
        let segments = split_path(&path)
            .map(|segment| {
                if segment.starts_with(':') {
                    Segment::Param
                } else {
                    Segment::Static(segment.to_string())
                }
            })
            .collect();

        Self {
            method,
            path,
            requirement,
            segments,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn requirement(&self) -> &SecurityRequirement {
        &self.requirement
    }

    /// Number of static segments when `path` matches, used to rank matches
    fn match_score(&self, method: &Method, path: &str) -> Option<usize> {
        if &self.method != method {
            return None;
        }

        let request: Vec<&str> = split_path(path).collect();
        if request.len() != self.segments.len() {
            return None;
        }

        let mut score = 0;
        for (segment, value) in self.segments.iter().zip(request) {
            match segment {
                Segment::Static(expected) if expected == value => score += 1,
                Segment::Static(_) => return None,
                Segment::Param if value.is_empty() => return None,
                Segment::Param => {}
            }
        }
        Some(score)
    }
}

/// Bound routes of all loaded descriptions
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<BoundRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: BoundRoute) {
        self.routes.push(route);
    }

    /// Best match for a request; static segments beat parameters
    ///
    /// HEAD requests fall back to the GET route when no HEAD route is bound,
    /// matching the router, which serves HEAD with the GET handler.
    pub fn find(&self, method: &Method, path: &str) -> Option<&BoundRoute> {
        match self.best_match(method, path) {
            None if *method == Method::HEAD => self.best_match(&Method::GET, path),
            found => found,
        }
    }

    fn best_match(&self, method: &Method, path: &str) -> Option<&BoundRoute> {
        let mut best: Option<(usize, &BoundRoute)> = None;
        for route in &self.routes {
            if let Some(score) = route.match_score(method, path) {
                if best.map(|(top, _)| score > top).unwrap_or(true) {
                    best = Some((score, route));
                }
            }
        }
        best.map(|(_, route)| route)
    }

    pub fn routes(&self) -> &[BoundRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Guard decision for one request
#[derive(Debug)]
pub enum Verdict {
    /// Route carries no security requirement
    Open,
    /// Authenticated and permitted
    Granted(Identity),
    /// No strategy authenticated the caller, or the caller is disabled
    Unauthenticated,
    /// Permission denied, or the route names an unusable strategy
    Forbidden,
    /// A verifier could not complete
    Failed,
}

/// Authentication and authorization for bound routes
pub struct SecurityGuard {
    registry: Arc<StrategyRegistry>,
    evaluator: PermissionEvaluator,
    table: RwLock<Arc<RouteTable>>,
}

impl SecurityGuard {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self {
            registry,
            evaluator: PermissionEvaluator::new(),
            table: RwLock::new(Arc::new(RouteTable::new())),
        }
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Replace the bound routes. In-flight requests keep the old table.
    pub fn install(&self, table: RouteTable) {
        *self.table.write() = Arc::new(table);
    }

    pub fn route_table(&self) -> Arc<RouteTable> {
        self.table.read().clone()
    }

    pub async fn authorize(&self, request: &RequestContext) -> Verdict {
        let table = self.route_table();
        let Some(route) = table.find(&request.method, &request.path) else {
            return Verdict::Open;
        };

        let requirement = route.requirement();
        if requirement.is_empty() {
            return Verdict::Open;
        }

        let mut strategies = Vec::with_capacity(requirement.len());
        for id in requirement.keys() {
            match self.registry.get(id) {
                Some(strategy) => strategies.push(strategy),
                None => {
                    warn!(
                        strategy = %id,
                        method = %request.method,
                        route = %route.path(),
                        "Route requires an unregistered strategy; rejecting"
                    );
                    return Verdict::Forbidden;
                }
            }
        }

        let mut identity = None;
        for strategy in strategies {
            match strategy.authenticate(request).await {
                AuthOutcome::Success(found) => {
                    identity = Some(found);
                    break;
                }
                AuthOutcome::Fail { reason } => {
                    debug!(strategy = %strategy.id(), reason = %reason, "Authentication failed");
                }
                AuthOutcome::Error(e) => {
                    error!(strategy = %strategy.id(), error = %e, "Authentication error");
                    return Verdict::Failed;
                }
            }
        }

        let Some(identity) = identity else {
            return Verdict::Unauthenticated;
        };

        if !identity.is_enabled() {
            debug!(identity = %identity.id(), "Rejecting disabled identity");
            return Verdict::Unauthenticated;
        }

        match self
            .evaluator
            .check(requirement, route.path(), &identity, &request.path)
        {
            Decision::Allow => Verdict::Granted(identity),
            Decision::Deny => Verdict::Forbidden,
        }
    }
}

/// Guard middleware
///
/// Install with `axum::middleware::from_fn_with_state(guard, enforce)`.
pub async fn enforce(
    State(guard): State<Arc<SecurityGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let context = RequestContext::from_parts(&parts);

    match guard.authorize(&context).await {
        Verdict::Open => {}
        Verdict::Granted(identity) => {
            parts.extensions.insert(AuthenticatedIdentity(identity));
        }
        Verdict::Unauthenticated => return StatusCode::UNAUTHORIZED.into_response(),
        Verdict::Forbidden => return StatusCode::FORBIDDEN.into_response(),
        Verdict::Failed => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    next.run(Request::from_parts(parts, body)).await
}
