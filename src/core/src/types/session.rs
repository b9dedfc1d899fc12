//! Per-session mutable store for session-bound identities

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Data persisted in a caller's session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Permissions acquired at runtime
    #[serde(default, rename = "p")]
    pub permissions: Vec<String>,

    /// Correlating identifier, generated on first use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlator: Option<String>,
}

/// Shared handle to a session's data
///
/// Cloning the handle shares the underlying data, so a permission appended
/// through an identity is visible to whoever owns the session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionData>>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from previously persisted data
    pub fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(data)),
        }
    }

    /// Copy of the current session data
    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().clone()
    }

    /// Permissions persisted in this session
    pub fn permissions(&self) -> Vec<String> {
        self.inner.lock().permissions.clone()
    }

    /// Persist a runtime permission
    pub fn push_permission(&self, permission: impl Into<String>) {
        self.inner.lock().permissions.push(permission.into());
    }

    /// Returns the session correlator, generating one on first call
    pub fn correlator(&self) -> String {
        let mut data = self.inner.lock();
        data.correlator
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlator_is_stable() {
        let session = Session::new();
        let first = session.correlator();
        let second = session.correlator();

        assert_eq!(first, second);
        assert_eq!(session.snapshot().correlator, Some(first));
    }

    #[test]
    fn test_clones_share_data() {
        let session = Session::new();
        let other = session.clone();

        other.push_permission("quote:read");
        assert_eq!(session.permissions(), vec!["quote:read".to_string()]);
    }

    #[test]
    fn test_session_data_wire_format() {
        let data: SessionData = serde_json::from_str(r#"{"p": ["api:read"]}"#).unwrap();
        assert_eq!(data.permissions, vec!["api:read".to_string()]);
        assert!(data.correlator.is_none());
    }
}
