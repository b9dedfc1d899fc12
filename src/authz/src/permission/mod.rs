//! Permission parsing, route-instance expansion, and evaluation

pub mod evaluator;
pub mod expand;
pub mod types;

pub use evaluator::{Decision, PermissionEvaluator, SecurityRequirement};
pub use expand::{expand_route_instance_permissions, route_params};
pub use types::{Permission, PermissionError, PermissionResult, PermissionSet};
