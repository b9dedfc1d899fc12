//! Identity record as held by the identity store

use super::identity::AlternateMapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authentication block of a stored identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAuthentication {
    /// Alternate identifier presented by API callers
    #[serde(default)]
    pub api_id: String,

    /// Message signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Whether the identity may access any API
    #[serde(default)]
    pub enabled: bool,
}

/// Stored identity record
///
/// ```json
/// {
///   "_id": "b0c2...",
///   "name": "Frank Krank Services, LLC",
///   "authentication": { "apiId": "7e06c4a6", "apiKey": "rqwH...", "enabled": true },
///   "permissions": ["api:*"],
///   "mappedUsers": { "data-provider": { "name": "data-provider-id" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Canonical id assigned by the store
    #[serde(rename = "_id")]
    pub store_id: String,

    /// Displayable name, also used as a lookup key
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub authentication: RecordAuthentication,

    #[serde(default)]
    pub permissions: Vec<String>,

    /// External-system mappings
    #[serde(default, rename = "mappedUsers")]
    pub mapped_users: BTreeMap<String, AlternateMapping>,
}

impl IdentityRecord {
    /// Create a record with the given canonical id, name, and alternate id
    pub fn new(
        store_id: impl Into<String>,
        name: impl Into<String>,
        api_id: impl Into<String>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            name: name.into(),
            authentication: RecordAuthentication {
                api_id: api_id.into(),
                api_key: None,
                enabled: false,
            },
            permissions: Vec::new(),
            mapped_users: BTreeMap::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.authentication.api_key = Some(key.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.authentication.enabled = enabled;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_mapping(mut self, system: impl Into<String>, mapping: AlternateMapping) -> Self {
        self.mapped_users.insert(system.into(), mapping);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_store_document() {
        let doc = r#"{
            "_id": "doc-1",
            "name": "Frank Krank Services, LLC",
            "authentication": {
                "apiId": "7e06c4a6-61bc-45a8-b2d7-24c405e8b27c",
                "apiKey": "rqwHvMvGLgtKNrgOpksK6rlIdyqZtD1mKVAsFzKJTOg",
                "enabled": true
            },
            "permissions": ["api:*"],
            "mappedUsers": { "data-provider": { "name": "data-provider-id" } }
        }"#;

        let record: IdentityRecord = serde_json::from_str(doc).unwrap();
        assert_eq!(record.store_id, "doc-1");
        assert_eq!(record.authentication.api_id, "7e06c4a6-61bc-45a8-b2d7-24c405e8b27c");
        assert!(record.authentication.enabled);
        assert_eq!(
            record.mapped_users["data-provider"].name(),
            Some("data-provider-id")
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let record: IdentityRecord = serde_json::from_str(r#"{"_id": "doc-2"}"#).unwrap();
        assert!(record.permissions.is_empty());
        assert!(!record.authentication.enabled);
        assert!(record.authentication.api_key.is_none());
    }
}
