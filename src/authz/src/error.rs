//! Error types for authentication and authorization

use thiserror::Error;

/// Authentication layer errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Strategy id already registered
    #[error("Strategy already registered: {0}")]
    RegistrationConflict(String),

    /// Strategy type is not one of the supported kinds
    #[error("Unsupported strategy type: {0}")]
    UnsupportedStrategy(String),

    /// Identity store connection missing or query failed
    #[error("Identity store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cache service failure
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Verification function reported an error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Malformed API description
    #[error("Invalid API description: {0}")]
    InvalidDescription(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Collaborator error
    #[error(transparent)]
    Core(#[from] gatehouse_core::CoreError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::CoreError;

    #[test]
    fn test_core_error_is_transparent() {
        let err: AuthError = CoreError::store("apikey database not available").into();
        assert_eq!(err.to_string(), "Store error: apikey database not available");
    }

    #[test]
    fn test_display() {
        let err = AuthError::UnsupportedStrategy("jwt".into());
        assert_eq!(err.to_string(), "Unsupported strategy type: jwt");
    }
}
