//! The token manager: generation and parsing
//!
//! The manager is a factory for json web tokens. It copies caller maps so
//! there are no side effects, stamps configured claims over them, renders
//! each value through the codec registry (or the primitive fallback),
//! assembles the compact serialization, and signs it. Parsing runs the
//! same machinery backwards and records whether the signature recomputed
//! correctly; a mismatch is state on the token, not an error.
//!
//! A single manager is meant to be shared across request handlers: all of
//! its state is immutable after construction and every operation is
//! synchronous, in-process work.

use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::algorithm::SigningAlgorithm;
use crate::claim::{ClaimCodecRegistry, ClaimMap, ClaimValue};
use crate::clock::{Clock, SystemClock};
use crate::codec::{base64url_decode, base64url_encode, constant_time_eq};
use crate::config::GenerationConfiguration;
use crate::error::{TokenError, TokenResult};
use crate::token::JsonWebToken;

// Derived from RFC 3986 appendix B, tightened to require a scheme of the
// RFC's grammar plus an authority component, since the jwt StringOrURI
// rule calls for an absolute URI rather than a URI-reference. Bare
// scheme-and-path values like `foo:bar` do not pass.
const URI_REGEX: &str = r"^([a-zA-Z][a-zA-Z0-9+.\-]*)://([^/?#]*)([^?#]*)(\?([^#]*))?(#(.*))?$";

/// Factory for generating and parsing json web tokens.
pub struct TokenManager {
    default_configuration: GenerationConfiguration,
    registry: ClaimCodecRegistry,
    uri_pattern: Regex,
    clock: Arc<dyn Clock>,
    enforce_key_length: bool,
}

impl TokenManager {
    /// Create a manager with the given default configuration and codec
    /// registry, reading time from the system clock.
    #[must_use]
    pub fn new(default_configuration: GenerationConfiguration, registry: ClaimCodecRegistry) -> Self {
        Self::with_clock(default_configuration, registry, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source.
    #[must_use]
    pub fn with_clock(
        default_configuration: GenerationConfiguration,
        registry: ClaimCodecRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            default_configuration,
            registry,
            // the pattern is a checked constant; compile failure is a
            // programming error, not a runtime condition
            uri_pattern: Regex::new(URI_REGEX).expect("URI pattern compiles"),
            clock,
            enforce_key_length: true,
        }
    }

    /// Stop enforcing the per-algorithm minimum key length.
    ///
    /// Interop with systems that use short secrets requires opting out
    /// explicitly; the default path rejects keys shorter than the digest
    /// size of the signing algorithm.
    #[must_use]
    pub fn allow_short_keys(mut self) -> Self {
        self.enforce_key_length = false;
        self
    }

    /// Generate a token from claims using the default configuration.
    pub fn generate(
        &self,
        claims: &ClaimMap,
        secret: Option<&[u8]>,
    ) -> TokenResult<JsonWebToken> {
        self.generate_with(None, claims, secret, None)
    }

    /// Generate a token from optional extra headers, claims, a signing
    /// secret, and an optional configuration override.
    ///
    /// Caller maps are copied; the caller keeps ownership of its
    /// originals. The manager writes `alg` itself (and deliberately does
    /// not write `typ`), then stamps the configured claims `iss`, `jti`,
    /// `iat`, `nbf`, and `exp` over any caller-provided values.
    pub fn generate_with(
        &self,
        headers: Option<&ClaimMap>,
        claims: &ClaimMap,
        secret: Option<&[u8]>,
        configuration: Option<&GenerationConfiguration>,
    ) -> TokenResult<JsonWebToken> {
        let configuration = configuration.unwrap_or(&self.default_configuration);
        let mut headers = headers.cloned().unwrap_or_default();
        let mut claims = claims.clone();

        let algorithm = configuration.signing_algorithm();
        if algorithm.is_signing() {
            self.check_secret(algorithm, secret)?;
        }
        headers.insert("alg", algorithm.wire_name());
        // 'typ' is only needed once encryption enters the picture, so it
        // is not written here

        if let Some(issuer) = configuration.issuer() {
            claims.insert("iss", issuer);
        }
        if configuration.generates_id() {
            claims.insert("jti", Uuid::new_v4().to_string());
        }
        let now = self.clock.unix_now();
        if configuration.includes_issued_time() {
            claims.insert("iat", now);
        }
        let delay = configuration.valid_delay();
        if let Some(delay) = delay {
            claims.insert("nbf", now + delay as i64);
        }
        if let Some(duration) = configuration.valid_duration() {
            let delay = delay.unwrap_or(0);
            claims.insert("exp", now + delay as i64 + duration as i64);
        }

        let header_segment = self.render_map(&headers)?;
        let claims_segment = self.render_map(&claims)?;
        let mut combined = format!("{header_segment}.{claims_segment}");

        if algorithm.is_signing() {
            let secret = secret.unwrap_or_default();
            let signature = algorithm.sign(secret, combined.as_bytes())?;
            combined.push('.');
            combined.push_str(&base64url_encode(&signature));
        } else {
            // unsigned tokens keep the trailing dot with an empty segment
            combined.push('.');
        }

        Ok(JsonWebToken::new(headers, claims, combined, true))
    }

    /// Parse a compact serialized token, verifying its signature against
    /// the given secret.
    ///
    /// Structural problems raise: wrong segment counts, bad base64url,
    /// bad json, an unknown `alg`. Policy outcomes do not: a signature
    /// that fails to recompute yields a token with `verified == false`,
    /// and timing claims are not examined at all.
    pub fn parse(&self, serialized: &str, secret: Option<&[u8]>) -> TokenResult<JsonWebToken> {
        if serialized.is_empty() {
            return Err(TokenError::malformed("token string is empty"));
        }
        let segments: Vec<&str> = serialized.split('.').collect();
        if segments.len() < 2 {
            return Err(TokenError::malformed("token contains wrong number of segments"));
        }

        let headers = self.parse_segment(segments[0], "header")?;
        let algorithm = match headers.get("alg") {
            Some(value) => match value.as_str() {
                Some(identifier) => SigningAlgorithm::from_wire(identifier)?,
                None => return Err(TokenError::malformed("the 'alg' header is not a string")),
            },
            None => {
                return Err(TokenError::malformed(
                    "the token is missing the signing algorithm",
                ))
            }
        };

        // segment counts depend on the algorithm; an unsigned token's
        // trailing dot shows up as an empty third slot, which is accepted
        let signature_slot = match (algorithm.is_signing(), segments.len()) {
            (true, 3) => Some(segments[2]),
            (false, 2) => None,
            (false, 3) => Some(segments[2]),
            _ => {
                return Err(TokenError::malformed(
                    "token contains wrong number of segments",
                ))
            }
        };

        let claims = self.parse_segment(segments[1], "claims")?;

        let verified = if algorithm.is_signing() {
            self.check_secret(algorithm, secret)?;
            let secret = secret.unwrap_or_default();
            let signature = base64url_decode(signature_slot.unwrap_or_default())?;
            let message = format!("{}.{}", segments[0], segments[1]);
            let expected = algorithm.sign(secret, message.as_bytes())?;
            let matched = constant_time_eq(&expected, &signature);
            if !matched {
                tracing::warn!(algorithm = algorithm.wire_name(), "token signature did not verify");
            }
            matched
        } else {
            // an unsigned token only counts as verified when nothing
            // suggests otherwise: no stray signature bytes, and no caller
            // secret implying the token was expected to be signed
            let stray_signature = signature_slot.is_some_and(|slot| !slot.is_empty());
            let secret_supplied = secret.is_some_and(|secret| !secret.is_empty());
            if secret_supplied {
                tracing::warn!("token declares 'none' but a secret was supplied; treating as unverified");
            }
            !stray_signature && !secret_supplied
        };

        Ok(JsonWebToken::new(headers, claims, serialized.to_string(), verified))
    }

    /// The manager's codec registry, for inspection.
    #[must_use]
    pub fn registry(&self) -> &ClaimCodecRegistry {
        &self.registry
    }

    /// The manager's clock, usable by callers that want authorization
    /// checks to read the same time source.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn check_secret(&self, algorithm: SigningAlgorithm, secret: Option<&[u8]>) -> TokenResult<()> {
        let secret = match secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                return Err(TokenError::configuration(format!(
                    "signing of type '{}' is configured but the secret is missing",
                    algorithm.wire_name()
                )))
            }
        };
        if self.enforce_key_length && secret.len() < algorithm.min_key_len() {
            return Err(TokenError::configuration(format!(
                "'{}' needs a key of at least {} bytes but got {}",
                algorithm.wire_name(),
                algorithm.min_key_len(),
                secret.len()
            )));
        }
        Ok(())
    }

    /// Render a header or claim map as a base64url segment of compact,
    /// insertion-ordered json.
    fn render_map(&self, map: &ClaimMap) -> TokenResult<String> {
        let mut output = Map::with_capacity(map.len());
        for (name, value) in map.iter() {
            // the JWT spec says names shouldn't repeat but apps allow it,
            // so nothing here enforces uniqueness beyond the map itself
            let element = match self.registry.codec(name) {
                Some(codec) => codec
                    .to_json(value)
                    .map_err(|source| TokenError::claim_encoding(name, source))?,
                None => self.render_primitive(name, value)?,
            };
            output.insert(name.to_string(), element);
        }
        let json = serde_json::to_string(&Value::Object(output))
            .map_err(|e| TokenError::configuration(format!("claims could not be rendered: {e}")))?;
        Ok(base64url_encode(json.as_bytes()))
    }

    /// Fallback translation for values with no registered codec: json
    /// primitives pass through, anything else has no translation.
    fn render_primitive(&self, name: &str, value: &ClaimValue) -> TokenResult<Value> {
        match value {
            ClaimValue::String(s) => {
                self.validate_string(name, s)?;
                Ok(Value::String(s.clone()))
            }
            ClaimValue::Integer(n) => Ok(Value::Number(Number::from(*n))),
            ClaimValue::Float(n) => Number::from_f64(*n).map(Value::Number).ok_or_else(|| {
                TokenError::invalid_claim_value(name, "non-finite numbers cannot be rendered")
            }),
            ClaimValue::Bool(b) => Ok(Value::Bool(*b)),
            ClaimValue::Json(element) => match element {
                Value::String(s) => {
                    self.validate_string(name, s)?;
                    Ok(element.clone())
                }
                Value::Number(_) | Value::Bool(_) => Ok(element.clone()),
                Value::Null => Err(TokenError::invalid_claim_value(
                    name,
                    "null values are not permitted; omit the claim instead",
                )),
                _ => Err(TokenError::invalid_claim_value(
                    name,
                    "value shape has no mechanism for translation",
                )),
            },
            ClaimValue::StringList(_) | ClaimValue::Custom(_) => Err(
                TokenError::invalid_claim_value(name, "value shape has no mechanism for translation"),
            ),
        }
    }

    /// Enforce the StringOrURI rule: any string containing a colon must
    /// be an absolute URI.
    fn validate_string(&self, name: &str, value: &str) -> TokenResult<()> {
        if !value.contains(':') || self.uri_pattern.is_match(value) {
            Ok(())
        } else {
            Err(TokenError::invalid_claim_value(
                name,
                format!("'{value}' contains a ':' but does not match the URI spec"),
            ))
        }
    }

    /// Base64url-decode a segment, parse the json object, and translate
    /// each member through the registry or the primitive fallback.
    fn parse_segment(&self, segment: &str, which: &str) -> TokenResult<ClaimMap> {
        let bytes = base64url_decode(segment)?;
        let parsed: Value = serde_json::from_slice(&bytes)
            .map_err(|e| TokenError::malformed(format!("{which} segment is not valid json: {e}")))?;
        let object = match parsed {
            Value::Object(object) => object,
            other => {
                return Err(TokenError::malformed(format!(
                    "{which} segment is not a json object: {other}"
                )))
            }
        };

        let mut output = ClaimMap::new();
        for (name, element) in object {
            let value = match self.registry.codec(&name) {
                Some(codec) => codec
                    .from_json(&element)
                    .map_err(|source| TokenError::claim_decoding(&name, source))?,
                None => match element {
                    Value::String(s) => ClaimValue::String(s),
                    Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            ClaimValue::Integer(i)
                        } else if let Some(f) = n.as_f64() {
                            ClaimValue::Float(f)
                        } else {
                            return Err(TokenError::malformed(format!(
                                "claim '{name}' holds a number outside the representable range"
                            )));
                        }
                    }
                    Value::Bool(b) => ClaimValue::Bool(b),
                    Value::Null => {
                        return Err(TokenError::malformed(format!(
                            "claim '{name}' is null, which has no mechanism for translation"
                        )))
                    }
                    // arrays and objects that no codec claimed stay opaque
                    // so unseen fields survive a round trip
                    other => ClaimValue::Json(other),
                },
            };
            output.insert(name, value);
        }
        Ok(output)
    }
}

impl Default for TokenManager {
    /// A manager with the default configuration and a fresh registry:
    /// HS256, no timing claims, only the built-in `aud` codec.
    fn default() -> Self {
        Self::new(GenerationConfiguration::default(), ClaimCodecRegistry::new())
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("default_configuration", &self.default_configuration)
            .field("registry", &self.registry)
            .field("enforce_key_length", &self.enforce_key_length)
            .finish_non_exhaustive()
    }
}
