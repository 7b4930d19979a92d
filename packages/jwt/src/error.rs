//! Error types for token generation, parsing, and claim translation

use thiserror::Error;

/// Result type for token operations
pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Boxed cause carried by codec failures
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Token operation errors.
///
/// Structural defects (bad segments, bad base64, bad JSON, unknown
/// algorithms) surface as errors from `generate` and `parse`. Signature
/// mismatches and timing outcomes are not errors; they are queryable state
/// on the token and on authorization decisions.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Structural defect in a serialized token
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The `alg` header names an algorithm the registry does not know
    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// Missing secret, short key, duplicate registration, and similar
    /// setup-time failures
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A registered codec failed while writing a claim to json
    #[error("claim '{claim}' could not be encoded")]
    ClaimEncoding {
        claim: String,
        #[source]
        source: CodecError,
    },

    /// A registered codec failed while reading a claim from json
    #[error("claim '{claim}' could not be decoded")]
    ClaimDecoding {
        claim: String,
        #[source]
        source: CodecError,
    },

    /// A claim value violates the rules for its shape, such as the
    /// StringOrURI rule for string claims
    #[error("claim '{claim}' has an invalid value: {reason}")]
    InvalidClaimValue { claim: String, reason: String },
}

impl TokenError {
    /// Create a malformed token error
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        TokenError::MalformedToken(msg.into())
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        TokenError::Configuration(msg.into())
    }

    /// Create a claim encoding error naming the failing claim
    #[must_use]
    pub fn claim_encoding(claim: impl Into<String>, source: CodecError) -> Self {
        TokenError::ClaimEncoding {
            claim: claim.into(),
            source,
        }
    }

    /// Create a claim decoding error naming the failing claim
    #[must_use]
    pub fn claim_decoding(claim: impl Into<String>, source: CodecError) -> Self {
        TokenError::ClaimDecoding {
            claim: claim.into(),
            source,
        }
    }

    /// Create an invalid claim value error
    #[must_use]
    pub fn invalid_claim_value(claim: impl Into<String>, reason: impl Into<String>) -> Self {
        TokenError::InvalidClaimValue {
            claim: claim.into(),
            reason: reason.into(),
        }
    }
}
