//! The immutable token value
//!
//! A token is what the manager hands back from both generation and
//! parsing: the header and claim maps, the exact compact serialization,
//! and whether the signature checked out. Timing outcomes (expired, not
//! yet valid) are queries, never errors; callers and the access-control
//! evaluator decide what to do with them.

use std::fmt;

use crate::claim::{ClaimMap, ClaimValue};

/// An immutable json web token.
#[derive(Debug, Clone)]
pub struct JsonWebToken {
    headers: ClaimMap,
    claims: ClaimMap,
    serialized: String,
    verified: bool,
}

impl JsonWebToken {
    pub(crate) fn new(headers: ClaimMap, claims: ClaimMap, serialized: String, verified: bool) -> Self {
        Self {
            headers,
            claims,
            serialized,
            verified,
        }
    }

    /// All headers, in wire order. Always contains `alg`.
    #[must_use]
    pub fn headers(&self) -> &ClaimMap {
        &self.headers
    }

    /// All claims, in wire order.
    #[must_use]
    pub fn claims(&self) -> &ClaimMap {
        &self.claims
    }

    /// Look up a header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&ClaimValue> {
        self.headers.get(name)
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name)
    }

    /// A string claim's value, if present and a string.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(ClaimValue::as_str)
    }

    /// An integer claim's value, if present and a whole number.
    #[must_use]
    pub fn claim_i64(&self, name: &str) -> Option<i64> {
        self.claims.get(name).and_then(ClaimValue::as_i64)
    }

    /// A boolean claim's value, if present and a boolean.
    #[must_use]
    pub fn claim_bool(&self, name: &str) -> Option<bool> {
        self.claims.get(name).and_then(ClaimValue::as_bool)
    }

    /// The exact compact serialization. For unsigned tokens the trailing
    /// dot is present with an empty signature segment.
    #[must_use]
    pub fn serialized(&self) -> &str {
        &self.serialized
    }

    /// True for freshly generated tokens; for parsed tokens, true iff the
    /// signature recomputed and matched (or the token was unsigned and no
    /// secret was expected).
    #[must_use]
    pub fn verified(&self) -> bool {
        self.verified
    }

    /// The `exp` claim in Unix seconds, if present.
    #[must_use]
    pub fn expiration(&self) -> Option<i64> {
        self.claim_i64("exp")
    }

    /// The `nbf` claim in Unix seconds, if present.
    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        self.claim_i64("nbf")
    }

    /// The `iat` claim in Unix seconds, if present.
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.claim_i64("iat")
    }

    /// True if an `exp` claim exists and `now` has reached it. The bound
    /// is exclusive: a token expiring at `t` is expired at `t`.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expiration() {
            Some(expiration) => now >= expiration,
            None => false,
        }
    }

    /// True if an `nbf` claim exists and `now` has not reached it. The
    /// bound is inclusive: a token valid from `t` is valid at `t`.
    #[must_use]
    pub fn is_not_yet_valid(&self, now: i64) -> bool {
        match self.not_before() {
            Some(not_before) => now < not_before,
            None => false,
        }
    }
}

impl fmt::Display for JsonWebToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_window(nbf: Option<i64>, exp: Option<i64>) -> JsonWebToken {
        let mut claims = ClaimMap::new();
        if let Some(nbf) = nbf {
            claims.insert("nbf", nbf);
        }
        if let Some(exp) = exp {
            claims.insert("exp", exp);
        }
        JsonWebToken::new(ClaimMap::new(), claims, String::new(), true)
    }

    #[test]
    fn expiration_bound_is_exclusive() {
        let token = token_with_window(None, Some(100));
        assert!(!token.is_expired(99));
        assert!(token.is_expired(100));
        assert!(token.is_expired(101));
    }

    #[test]
    fn not_before_bound_is_inclusive() {
        let token = token_with_window(Some(50), None);
        assert!(token.is_not_yet_valid(49));
        assert!(!token.is_not_yet_valid(50));
    }

    #[test]
    fn missing_timing_claims_never_gate() {
        let token = token_with_window(None, None);
        assert!(!token.is_expired(i64::MAX));
        assert!(!token.is_not_yet_valid(i64::MIN));
    }
}
