//! Resolved caller identity
//!
//! An [`Identity`] is the base record every strategy produces. Provenance
//! specific behavior is carried by a [`Capability`] rather than by subtypes:
//! service identities hold the HMAC signing secret, session-bound identities
//! hold a [`Session`] that receives runtime permissions.

use super::record::IdentityRecord;
use super::session::Session;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// How an identity presents itself to an external system
///
/// e.g. `{"name": "PSIQSFIAPI"}` or `{"apiId": "abc1234"}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlternateMapping(Map<String, Value>);

impl AlternateMapping {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Mapping with a single `name` field
    pub fn named(name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.into()));
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }
}

/// HMAC signing secret of a service identity
///
/// Never serialized and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<redacted>)")
    }
}

/// Provenance of an identity and the behavior attached to it
#[derive(Debug, Clone, Default)]
pub enum Capability {
    /// Plain identity
    #[default]
    Core,

    /// Service caller authenticated by signed requests
    Service { signing_secret: Option<SigningSecret> },

    /// Caller bound to a web session
    Session(Session),
}

/// Resolved caller record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "IdentityWire", into = "IdentityWire")]
pub struct Identity {
    id: String,
    display_name: String,
    permissions: Vec<String>,
    enabled: bool,
    realm: Option<String>,
    alternate_mappings: BTreeMap<String, AlternateMapping>,
    capability: Capability,
}

impl Identity {
    /// Create an identity. Fails when `id` is empty.
    ///
    /// New identities are disabled until [`Identity::with_enabled`] says
    /// otherwise.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::invalid("identity id cannot be empty"));
        }

        Ok(Self {
            id,
            display_name: display_name.into(),
            permissions: Vec::new(),
            enabled: false,
            realm: None,
            alternate_mappings: BTreeMap::new(),
            capability: Capability::Core,
        })
    }

    /// Build a plain identity from a store record
    pub fn from_record(record: &IdentityRecord) -> Result<Self> {
        let identity = Self::new(&record.authentication.api_id, &record.name)?
            .with_permissions(record.permissions.clone())
            .with_enabled(record.authentication.enabled);

        Ok(record
            .mapped_users
            .iter()
            .fold(identity, |identity, (system, mapping)| {
                identity.with_alternate_mapping(system.clone(), mapping.clone())
            }))
    }

    /// Build a service identity that carries the record's signing key
    pub fn service(record: &IdentityRecord) -> Result<Self> {
        let mut identity = Self::from_record(record)?;
        identity.capability = Capability::Service {
            signing_secret: record
                .authentication
                .api_key
                .as_ref()
                .map(SigningSecret::new),
        };
        Ok(identity)
    }

    /// Build a session-bound identity
    ///
    /// Permissions previously persisted in the session are restored on top of
    /// the ones loaded from the store.
    pub fn session_bound(record: &IdentityRecord, session: Session) -> Result<Self> {
        let mut identity = Self::from_record(record)?;
        identity.permissions.extend(session.permissions());
        identity.capability = Capability::Session(session);
        Ok(identity)
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_alternate_mapping(
        mut self,
        system: impl Into<String>,
        mapping: AlternateMapping,
    ) -> Self {
        self.alternate_mappings.insert(system.into(), mapping);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Strategy that last authenticated this identity
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Tag the identity with the authenticating strategy
    pub fn set_realm(&mut self, realm: impl Into<String>) {
        self.realm = Some(realm.into());
    }

    pub fn alternate_mapping(&self, system: &str) -> Option<&AlternateMapping> {
        self.alternate_mappings.get(system)
    }

    pub fn alternate_mappings(&self) -> &BTreeMap<String, AlternateMapping> {
        &self.alternate_mappings
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn signing_secret(&self) -> Option<&SigningSecret> {
        match &self.capability {
            Capability::Service { signing_secret } => signing_secret.as_ref(),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.capability {
            Capability::Session(session) => Some(session),
            _ => None,
        }
    }

    /// Append a permission
    ///
    /// Session-bound identities also persist the permission into their
    /// session so it survives the request.
    pub fn add_permission(&mut self, permission: impl Into<String>) {
        let permission = permission.into();
        if let Capability::Session(session) = &self.capability {
            session.push_permission(permission.clone());
        }
        self.permissions.push(permission);
    }

    /// Identifier unique to this caller
    ///
    /// Session-bound identities share a store record (e.g. `anonymous`), so
    /// they are told apart by the session correlator instead of the id.
    pub fn unique_id(&self) -> String {
        match &self.capability {
            Capability::Session(session) => session.correlator(),
            _ => self.id.clone(),
        }
    }
}

/// Serialized form of an identity. Capabilities are never written out.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityWire {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    realm: Option<String>,
    #[serde(default)]
    alternate_mappings: BTreeMap<String, AlternateMapping>,
}

impl TryFrom<IdentityWire> for Identity {
    type Error = CoreError;

    fn try_from(wire: IdentityWire) -> Result<Self> {
        let mut identity = Identity::new(wire.id, wire.display_name)?
            .with_permissions(wire.permissions)
            .with_enabled(wire.enabled);
        identity.realm = wire.realm;
        identity.alternate_mappings = wire.alternate_mappings;
        Ok(identity)
    }
}

impl From<Identity> for IdentityWire {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name,
            permissions: identity.permissions,
            enabled: identity.enabled,
            realm: identity.realm,
            alternate_mappings: identity.alternate_mappings,
        }
    }
}
