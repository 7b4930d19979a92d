//! Error types for capability registration and evaluation

use thiserror::Error;

/// Result type for access-control operations
pub type AccessControlResult<T> = std::result::Result<T, AccessControlError>;

/// Access-control errors.
///
/// These cover setup-time problems. Request-time outcomes are not errors;
/// they are [`Decision`](crate::Decision) values with a denial reason.
#[derive(Debug, Error)]
pub enum AccessControlError {
    /// Bad registration: duplicate claims or operations, families bound
    /// twice, requirements naming unregistered claims
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A capability name that is not part of the family it was used with
    #[error("capability '{capability}' is not part of family '{family}'")]
    UnknownCapability { family: String, capability: String },
}

impl AccessControlError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        AccessControlError::Configuration(msg.into())
    }

    /// Create an unknown capability error
    #[must_use]
    pub fn unknown_capability(family: impl Into<String>, capability: impl Into<String>) -> Self {
        AccessControlError::UnknownCapability {
            family: family.into(),
            capability: capability.into(),
        }
    }
}
