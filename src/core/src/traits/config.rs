//! Host configuration access

use serde_json::Value;

/// Read-only view of the host application's configuration
pub trait HostConfig: Send + Sync {
    /// Value at a dotted path such as `hmac.key`
    fn get(&self, path: &str) -> Option<Value>;

    /// String value at a dotted path
    fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}
