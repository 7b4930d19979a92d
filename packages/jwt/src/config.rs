//! Declarative generation policy
//!
//! A configuration says which claims the manager writes on top of the
//! caller's own: the issuer, a generated id, the issued-at instant, and
//! the validity window. Configured values override caller-provided ones.

use crate::algorithm::SigningAlgorithm;

/// Policy applied when generating a token.
///
/// The default is the quiet one: no issuer, no generated id, no timing
/// claims, HS256 signing.
#[derive(Debug, Clone)]
pub struct GenerationConfiguration {
    issuer: Option<String>,
    generate_id: bool,
    include_issued_time: bool,
    valid_delay_secs: Option<u64>,
    valid_duration_secs: Option<u64>,
    signing_algorithm: SigningAlgorithm,
}

impl Default for GenerationConfiguration {
    fn default() -> Self {
        Self {
            issuer: None,
            generate_id: false,
            include_issued_time: false,
            valid_delay_secs: None,
            valid_duration_secs: None,
            signing_algorithm: SigningAlgorithm::Hs256,
        }
    }
}

impl GenerationConfiguration {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `iss` with the given issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Stamp `jti` with a fresh random identifier on every generation.
    #[must_use]
    pub fn with_generated_id(mut self) -> Self {
        self.generate_id = true;
        self
    }

    /// Stamp `iat` with the generation instant.
    #[must_use]
    pub fn with_issued_time(mut self) -> Self {
        self.include_issued_time = true;
        self
    }

    /// Stamp `nbf` at generation instant plus `delay_secs`.
    #[must_use]
    pub fn with_valid_delay(mut self, delay_secs: u64) -> Self {
        self.valid_delay_secs = Some(delay_secs);
        self
    }

    /// Stamp `exp` at generation instant plus the delay (zero when not
    /// set) plus `duration_secs`.
    #[must_use]
    pub fn with_valid_duration(mut self, duration_secs: u64) -> Self {
        self.valid_duration_secs = Some(duration_secs);
        self
    }

    /// Sign with the given algorithm.
    #[must_use]
    pub fn with_signing_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = algorithm;
        self
    }

    /// Do not sign; the serialized token carries an empty signature
    /// segment and `alg` is `none`.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.signing_algorithm = SigningAlgorithm::None;
        self
    }

    /// The configured issuer, if any.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// True if `jti` is generated.
    #[must_use]
    pub fn generates_id(&self) -> bool {
        self.generate_id
    }

    /// True if `iat` is stamped.
    #[must_use]
    pub fn includes_issued_time(&self) -> bool {
        self.include_issued_time
    }

    /// Seconds between generation and `nbf`, if configured.
    #[must_use]
    pub fn valid_delay(&self) -> Option<u64> {
        self.valid_delay_secs
    }

    /// Seconds of validity after the delay, if configured.
    #[must_use]
    pub fn valid_duration(&self) -> Option<u64> {
        self.valid_duration_secs
    }

    /// The signing algorithm.
    #[must_use]
    pub fn signing_algorithm(&self) -> SigningAlgorithm {
        self.signing_algorithm
    }
}
