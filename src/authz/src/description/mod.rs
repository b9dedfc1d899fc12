//! Declarative API descriptions
//!
//! Swagger 2.0 documents extended with two vendor fields:
//!
//! - `x-securityDefinitions`: strategies by id, each naming its type, its
//!   verification function (`service.method`), and options
//! - `x-security` on an operation: realm to required permissions
//!
//! ```json
//! {
//!   "swagger": "2.0",
//!   "basePath": "/api/v1",
//!   "x-securityDefinitions": {
//!     "hmac_auth": { "type": "hmac", "method": "apiUserService.getApiUserById" }
//!   },
//!   "paths": {
//!     "/claims/{claimid}": {
//!       "get": { "x-security": { "hmac_auth": ["claim:read:{claimid}"] } }
//!     }
//!   }
//! }
//! ```

pub mod loader;

pub use loader::{load_dir, DescriptionDir};

use crate::error::Result;
use crate::permission::SecurityRequirement;
use axum::http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Operation keys recognised inside a path item, in binding order
pub const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// A strategy declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityDefinition {
    /// Strategy type (`hmac`, `anon`)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Verification function as `service.method`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Strategy options; string values may be `{{config.path}}` placeholders
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// A single operation (path + verb)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(default, rename = "x-security", skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityRequirement>,
}

/// Operations available on one path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    /// Declared operations in [`HTTP_METHODS`] order
    pub fn operations(&self) -> Vec<(Method, &Operation)> {
        [
            (Method::GET, &self.get),
            (Method::PUT, &self.put),
            (Method::POST, &self.post),
            (Method::DELETE, &self.delete),
            (Method::OPTIONS, &self.options),
            (Method::HEAD, &self.head),
            (Method::PATCH, &self.patch),
        ]
        .into_iter()
        .filter_map(|(method, operation)| operation.as_ref().map(|op| (method, op)))
        .collect()
    }
}

/// One API description document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDescription {
    /// Swagger version marker; documents without it are not descriptions
    pub swagger: String,

    #[serde(default, rename = "basePath", skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,

    #[serde(default, rename = "x-securityDefinitions")]
    pub security_definitions: IndexMap<String, SecurityDefinition>,
}

impl ApiDescription {
    pub fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or("")
    }
}

/// Descriptions keyed by name
pub type DescriptionSet = BTreeMap<String, ApiDescription>;

/// Source of API descriptions
pub trait DescriptionProvider: Send + Sync {
    fn list_descriptions(&self) -> Result<DescriptionSet>;
}

impl DescriptionProvider for DescriptionSet {
    fn list_descriptions(&self) -> Result<DescriptionSet> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_description() {
        let description: ApiDescription = serde_json::from_value(json!({
            "swagger": "2.0",
            "basePath": "/api/v1",
            "x-securityDefinitions": {
                "hmac_auth": {
                    "type": "hmac",
                    "method": "apiUserService.getApiUserById",
                    "options": { "scheme": "{{hmac.scheme}}" }
                }
            },
            "paths": {
                "/claims/{claimid}": {
                    "parameters": [{ "name": "claimid", "in": "path" }],
                    "get": {
                        "operationId": "getClaim",
                        "x-security": { "hmac_auth": ["claim:read:{claimid}"] }
                    },
                    "delete": {}
                }
            }
        }))
        .unwrap();

        assert_eq!(description.base_path(), "/api/v1");
        let definition = &description.security_definitions["hmac_auth"];
        assert_eq!(definition.kind, "hmac");
        assert_eq!(definition.options.get("scheme"), Some(&json!("{{hmac.scheme}}")));

        let operations = description.paths["/claims/{claimid}"].operations();
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].0, Method::GET);
        assert_eq!(
            operations[0].1.security.as_ref().unwrap()["hmac_auth"],
            vec!["claim:read:{claimid}".to_string()]
        );
        assert_eq!(operations[1].0, Method::DELETE);
        assert!(operations[1].1.security.is_none());
    }

    #[test]
    fn test_requirement_keeps_declaration_order() {
        let operation: Operation = serde_json::from_value(json!({
            "x-security": { "zeta": [], "alpha": ["api:read"] }
        }))
        .unwrap();

        let realms: Vec<&String> = operation.security.as_ref().unwrap().keys().collect();
        assert_eq!(realms, vec!["zeta", "alpha"]);
    }
}
