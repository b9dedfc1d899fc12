//! Configuration loading
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [identity]
//! ttl_secs = 600
//! cache_namespace = "ApiUserNs"
//!
//! [descriptions]
//! dir = "swagger"
//!
//! [authentication.hmac]
//! id = "7e06c4a6"
//! key = "rqwH..."
//! ```
//!
//! Strategy option placeholders (`{{hmac.scheme}}`) resolve against the
//! `authentication` table.

use crate::error::{AuthError, Result};
use crate::resolver::ResolverConfig;
use gatehouse_core::HostConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete gatehouse configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatehouseConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub identity: IdentitySection,

    #[serde(default)]
    pub descriptions: DescriptionsSection,

    /// Free-form strategy settings
    #[serde(default)]
    pub authentication: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentitySection {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_namespace")]
    pub cache_namespace: String,
    /// How often expired cache entries are swept
    #[serde(default = "default_cleanup_interval")]
    pub cache_cleanup_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DescriptionsSection {
    #[serde(default = "default_descriptions_dir")]
    pub dir: PathBuf,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_ttl() -> u64 { 600 }
fn default_store_timeout() -> u64 { 5000 }
fn default_namespace() -> String { "ApiUserNs".to_string() }
fn default_cleanup_interval() -> u64 { 60 }
fn default_descriptions_dir() -> PathBuf { PathBuf::from("swagger") }

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            store_timeout_ms: default_store_timeout(),
            cache_namespace: default_namespace(),
            cache_cleanup_secs: default_cleanup_interval(),
        }
    }
}

impl Default for DescriptionsSection {
    fn default() -> Self {
        Self {
            dir: default_descriptions_dir(),
        }
    }
}

impl IdentitySection {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            namespace: self.cache_namespace.clone(),
            ttl: Duration::from_secs(self.ttl_secs),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }
}

impl GatehouseConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_tree(&ConfigTree::load(path)?)
    }

    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        serde_json::from_value(tree.root().clone())
            .map_err(|e| AuthError::Configuration(format!("invalid configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.identity.ttl_secs == 0 {
            return Err(AuthError::Configuration("identity.ttl_secs must be positive".into()));
        }
        if self.identity.store_timeout_ms == 0 {
            return Err(AuthError::Configuration(
                "identity.store_timeout_ms must be positive".into(),
            ));
        }
        if self.identity.cache_namespace.is_empty() {
            return Err(AuthError::Configuration(
                "identity.cache_namespace cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Host configuration view used for strategy option placeholders
    pub fn authentication_tree(&self) -> ConfigTree {
        ConfigTree::new(Value::Object(self.authentication.clone()))
    }
}

/// Configuration tree addressed by dotted paths
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(contents)
            .map_err(|e| AuthError::Configuration(format!("failed to parse configuration: {}", e)))?;
        Ok(Self::new(serde_json::to_value(value)?))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Subtree at `path`; empty when absent
    pub fn section(&self, path: &str) -> ConfigTree {
        ConfigTree::new(self.lookup(path).cloned().unwrap_or(Value::Null))
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl HostConfig for ConfigTree {
    fn get(&self, path: &str) -> Option<Value> {
        self.lookup(path).cloned()
    }
}
