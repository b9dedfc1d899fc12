/// Permission strings and wildcard matching
///
/// A permission is a colon-separated hierarchy such as `quote:read:42`.
/// Granted permissions may use `*` segments:
/// - `quote:*:42` (wildcard - matches exactly one segment)
/// - `quote:*` (trailing wildcard - matches that segment and all after it)

use std::fmt;
use std::str::FromStr;

/// Result type for permission parsing
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors that can occur while parsing a permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Empty permission string provided
    EmptyPermission,
    /// Permission segment is empty
    EmptySegment,
    /// Wildcard mixed with other characters
    InvalidWildcard(String),
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "Permission cannot be empty"),
            Self::EmptySegment => write!(f, "Permission segment cannot be empty"),
            Self::InvalidWildcard(segment) => {
                write!(f, "Wildcards must be standalone: '{}'", segment)
            }
        }
    }
}

impl std::error::Error for PermissionError {}

/// Wildcard marker
pub const WILDCARD: &str = "*";

/// A parsed permission
///
/// # Examples
///
/// ```
/// use gatehouse_authz::permission::Permission;
///
/// let granted = Permission::new("api:*").unwrap();
/// assert!(granted.implies(&Permission::new("api:write:42").unwrap()));
/// assert!(!granted.implies(&Permission::new("api").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
    raw: String,
    segments: Vec<String>,
}

impl Permission {
    /// Parses a permission string
    ///
    /// # Arguments
    ///
    /// * `s` - The permission string (e.g., "claim:read:37103")
    pub fn new(s: &str) -> PermissionResult<Self> {
        if s.is_empty() {
            return Err(PermissionError::EmptyPermission);
        }

        let segments: Vec<String> = s.split(':').map(str::to_string).collect();
        for segment in &segments {
            if segment.is_empty() {
                return Err(PermissionError::EmptySegment);
            }
            if segment.contains('*') && segment != WILDCARD {
                return Err(PermissionError::InvalidWildcard(segment.clone()));
            }
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this (granted) permission satisfies `required`
    ///
    /// Segments are compared left to right. A `*` segment matches whatever
    /// single segment sits at its position; in last position it also
    /// matches every segment after it. A wildcard never stands in for a
    /// missing segment.
    pub fn implies(&self, required: &Permission) -> bool {
        let granted = &self.segments;
        let required = &required.segments;

        if granted.len() > required.len() {
            return false;
        }

        let trailing_wildcard = granted.last().map(|s| s == WILDCARD).unwrap_or(false);
        if granted.len() < required.len() && !trailing_wildcard {
            return false;
        }

        granted
            .iter()
            .zip(required.iter())
            .all(|(granted, required)| granted == WILDCARD || granted == required)
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> PermissionResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Permissions granted to a caller
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    grants: Vec<Permission>,
}

impl PermissionSet {
    /// Parses granted permission strings, skipping malformed ones
    pub fn from_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let grants = grants
            .into_iter()
            .filter_map(|grant| match Permission::new(grant.as_ref()) {
                Ok(permission) => Some(permission),
                Err(e) => {
                    tracing::debug!(grant = %grant.as_ref(), error = %e, "Ignoring malformed grant");
                    None
                }
            })
            .collect();
        Self { grants }
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether any grant implies `required`
    pub fn implies(&self, required: &Permission) -> bool {
        self.grants.iter().any(|grant| grant.implies(required))
    }

    /// Whether every required permission is implied by some grant
    ///
    /// A malformed requirement can never be satisfied.
    pub fn is_permitted<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|required| match Permission::new(required.as_ref()) {
            Ok(required) => self.implies(&required),
            Err(_) => false,
        })
    }
}
