//! Signing algorithm registry
//!
//! This is the only module that knows which MAC primitive backs a wire
//! identifier, so adding an algorithm never touches the manager or the
//! token model. Only the HMAC families are supported; `none` is a real
//! variant that produces an empty signature and is permitted only when a
//! configuration explicitly asks for it.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{TokenError, TokenResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// The signing algorithm of a token, as named by the `alg` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// Unsigned; the serialized form carries an empty signature segment
    None,
    /// HMAC using SHA-256
    Hs256,
    /// HMAC using SHA-384
    Hs384,
    /// HMAC using SHA-512
    Hs512,
}

impl SigningAlgorithm {
    /// Resolve a wire identifier to an algorithm. Matching is
    /// case-sensitive per the JWS registry.
    pub fn from_wire(identifier: &str) -> TokenResult<Self> {
        match identifier {
            "none" => Ok(SigningAlgorithm::None),
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "HS384" => Ok(SigningAlgorithm::Hs384),
            "HS512" => Ok(SigningAlgorithm::Hs512),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The identifier written to the `alg` header.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            SigningAlgorithm::None => "none",
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Hs384 => "HS384",
            SigningAlgorithm::Hs512 => "HS512",
        }
    }

    /// The name of the backing MAC primitive, if the variant signs.
    #[must_use]
    pub fn mac_name(&self) -> Option<&'static str> {
        match self {
            SigningAlgorithm::None => None,
            SigningAlgorithm::Hs256 => Some("HMAC-SHA256"),
            SigningAlgorithm::Hs384 => Some("HMAC-SHA384"),
            SigningAlgorithm::Hs512 => Some("HMAC-SHA512"),
        }
    }

    /// Minimum key length in bytes, matching the digest size of the
    /// backing hash. Enforcement is the manager's decision; the MAC
    /// itself accepts shorter keys for interop.
    #[must_use]
    pub fn min_key_len(&self) -> usize {
        match self {
            SigningAlgorithm::None => 0,
            SigningAlgorithm::Hs256 => 32,
            SigningAlgorithm::Hs384 => 48,
            SigningAlgorithm::Hs512 => 64,
        }
    }

    /// True for every variant other than `none`.
    #[must_use]
    pub fn is_signing(&self) -> bool {
        !matches!(self, SigningAlgorithm::None)
    }

    /// Compute the signature over `message` with `key`. The `none`
    /// variant yields an empty signature.
    pub fn sign(&self, key: &[u8], message: &[u8]) -> TokenResult<Vec<u8>> {
        match self {
            SigningAlgorithm::None => Ok(Vec::new()),
            SigningAlgorithm::Hs256 => mac_sign::<HmacSha256>(key, message),
            SigningAlgorithm::Hs384 => mac_sign::<HmacSha384>(key, message),
            SigningAlgorithm::Hs512 => mac_sign::<HmacSha512>(key, message),
        }
    }
}

fn mac_sign<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> TokenResult<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| TokenError::configuration("invalid MAC key"))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
