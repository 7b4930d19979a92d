//! Base64url segment handling and signature comparison
//!
//! Compact serialization uses the RFC 4648 §5 url-safe alphabet with the
//! padding stripped. Decoding accepts missing padding but rejects any
//! character outside the alphabet, including `=`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use subtle::ConstantTimeEq;

use crate::error::{TokenError, TokenResult};

/// Encode bytes as an unpadded base64url segment.
#[inline]
#[must_use]
pub fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decode an unpadded base64url segment.
///
/// Padding characters and anything else outside the url-safe alphabet are
/// structural defects and fail with [`TokenError::MalformedToken`].
#[inline]
pub fn base64url_decode(input: &str) -> TokenResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|e| TokenError::malformed(format!("segment is not valid base64url: {e}")))
}

/// Length-independent constant-time comparison of two byte slices.
///
/// Used for signature checks so that comparison time does not leak how much
/// of a forged signature matched.
#[inline]
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
