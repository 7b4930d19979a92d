//! The access-control manager and its decisions
//!
//! The manager is configured once at startup: capability-bearing claims
//! are bound to their families (and the matching codec dropped into the
//! token manager's registry), then each protected operation registers the
//! requirements it demands. Authorization afterwards is read-only and
//! cheap: a verified-flag check, a validity-window check, and bitset
//! containment per requirement.
//!
//! Denials are outcomes, not errors. Errors are reserved for bad
//! registration, which is a deployment problem rather than a request
//! problem.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tales_jwt::{ClaimCodecRegistry, Clock, JsonWebToken, SystemClock};

use crate::capability::{CapabilityClaimCodec, CapabilityFamily, CapabilitySet};
use crate::error::{AccessControlError, AccessControlResult};
use crate::requirements::CapabilityRequirement;

/// The outcome of evaluating a token against an operation's requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Every requirement was satisfied
    Granted,
    /// A requirement failed; the reason says which gate stopped it
    Denied(DenialReason),
}

impl Decision {
    /// True for [`Decision::Granted`].
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// Why a token was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The token's signature did not verify, or it declared `none` when a
    /// signature was expected
    Unverified,
    /// The current time has reached the token's `exp`
    Expired,
    /// The current time has not reached the token's `nbf`
    NotYetValid,
    /// A required claim is absent
    MissingClaim(String),
    /// The claim is not a capability set of the family registered for it
    FamilyMismatch(String),
    /// The claim's set is missing required capabilities
    InsufficientCapabilities {
        claim: String,
        missing: Vec<String>,
    },
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::Unverified => write!(f, "unverified"),
            DenialReason::Expired => write!(f, "expired"),
            DenialReason::NotYetValid => write!(f, "not_yet_valid"),
            DenialReason::MissingClaim(claim) => write!(f, "missing_claim: {claim}"),
            DenialReason::FamilyMismatch(claim) => write!(f, "family_mismatch: {claim}"),
            DenialReason::InsufficientCapabilities { claim, missing } => {
                write!(f, "insufficient_capabilities: {claim} [{}]", missing.join(", "))
            }
        }
    }
}

/// A requirement resolved against its family at registration time.
struct CompiledRequirement {
    claim: String,
    required: CapabilitySet,
    required_names: Vec<String>,
}

/// Evaluates verified tokens against per-operation capability
/// requirements.
pub struct AccessControlManager {
    families: HashMap<String, Arc<CapabilityFamily>>,
    bound_families: HashSet<String>,
    operations: HashMap<String, Vec<CompiledRequirement>>,
    clock: Arc<dyn Clock>,
}

impl AccessControlManager {
    /// Create a manager reading time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source, typically the one
    /// shared with the token manager.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            families: HashMap::new(),
            bound_families: HashSet::new(),
            operations: HashMap::new(),
            clock,
        }
    }

    /// Bind a claim name to a capability family and register the matching
    /// codec so the token manager materializes the claim as a set.
    ///
    /// The binding is one-to-one: a claim carries exactly one family and
    /// a family lives under exactly one claim.
    pub fn register_capability_claim(
        &mut self,
        claim: &str,
        family: &Arc<CapabilityFamily>,
        registry: &mut ClaimCodecRegistry,
    ) -> AccessControlResult<()> {
        if claim.is_empty() {
            return Err(AccessControlError::configuration(
                "need a claim name to bind a capability family",
            ));
        }
        if self.families.contains_key(claim) {
            return Err(AccessControlError::configuration(format!(
                "claim '{claim}' already carries a capability family"
            )));
        }
        if !self.bound_families.insert(family.name().to_string()) {
            return Err(AccessControlError::configuration(format!(
                "capability family '{}' is already bound to a claim",
                family.name()
            )));
        }
        registry
            .register(claim, Arc::new(CapabilityClaimCodec::new(Arc::clone(family))))
            .map_err(|e| {
                AccessControlError::configuration(format!(
                    "could not register the codec for claim '{claim}': {e}"
                ))
            })?;
        self.families.insert(claim.to_string(), Arc::clone(family));
        Ok(())
    }

    /// Register the requirements an operation demands.
    ///
    /// Claims must already be bound to families, and every capability
    /// name must belong to its claim's family; unknown names are rejected
    /// here so that request-time evaluation never sees them.
    pub fn register_operation(
        &mut self,
        operation: &str,
        requirements: &[CapabilityRequirement],
    ) -> AccessControlResult<()> {
        if operation.is_empty() {
            return Err(AccessControlError::configuration(
                "need an operation name to register requirements",
            ));
        }
        if self.operations.contains_key(operation) {
            return Err(AccessControlError::configuration(format!(
                "operation '{operation}' already has requirements registered"
            )));
        }

        let mut compiled = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let family = self.families.get(requirement.claim()).ok_or_else(|| {
                AccessControlError::configuration(format!(
                    "operation '{operation}' requires claim '{}', which has no capability family",
                    requirement.claim()
                ))
            })?;
            let required = family
                .set_of(requirement.capabilities().iter().map(String::as_str))
                .map_err(|e| {
                    AccessControlError::configuration(format!(
                        "operation '{operation}' has an invalid requirement: {e}"
                    ))
                })?;
            compiled.push(CompiledRequirement {
                claim: requirement.claim().to_string(),
                required,
                required_names: requirement.capabilities().to_vec(),
            });
        }
        self.operations.insert(operation.to_string(), compiled);
        Ok(())
    }

    /// Evaluate a parsed token against a registered operation.
    ///
    /// Naming an operation that was never registered is a configuration
    /// error; everything about the token itself comes back as a
    /// [`Decision`].
    pub fn authorize(&self, token: &JsonWebToken, operation: &str) -> AccessControlResult<Decision> {
        let requirements = self.operations.get(operation).ok_or_else(|| {
            AccessControlError::configuration(format!(
                "operation '{operation}' has no requirements registered"
            ))
        })?;
        Ok(self.evaluate(token, requirements, operation))
    }

    fn evaluate(
        &self,
        token: &JsonWebToken,
        requirements: &[CompiledRequirement],
        operation: &str,
    ) -> Decision {
        if !token.verified() {
            tracing::debug!(operation, "denied: token is unverified");
            return Decision::Denied(DenialReason::Unverified);
        }

        let now = self.clock.unix_now();
        if token.is_expired(now) {
            tracing::debug!(operation, "denied: token is expired");
            return Decision::Denied(DenialReason::Expired);
        }
        if token.is_not_yet_valid(now) {
            tracing::debug!(operation, "denied: token is not yet valid");
            return Decision::Denied(DenialReason::NotYetValid);
        }

        for requirement in requirements {
            let value = match token.claim(&requirement.claim) {
                Some(value) => value,
                None => {
                    tracing::debug!(operation, claim = %requirement.claim, "denied: claim missing");
                    return Decision::Denied(DenialReason::MissingClaim(requirement.claim.clone()));
                }
            };
            let held = match value.downcast_ref::<CapabilitySet>() {
                Some(held) => held,
                None => {
                    tracing::debug!(operation, claim = %requirement.claim, "denied: claim is not a capability set");
                    return Decision::Denied(DenialReason::FamilyMismatch(requirement.claim.clone()));
                }
            };
            // the registered family is authoritative; a set decoded under
            // some other family does not count
            let family = self.families.get(&requirement.claim);
            if !family.is_some_and(|family| Arc::ptr_eq(held.family(), family)) {
                tracing::debug!(operation, claim = %requirement.claim, "denied: capability family mismatch");
                return Decision::Denied(DenialReason::FamilyMismatch(requirement.claim.clone()));
            }
            if !held.contains_all(&requirement.required) {
                let missing: Vec<String> = requirement
                    .required_names
                    .iter()
                    .filter(|name| !held.has(name))
                    .cloned()
                    .collect();
                tracing::debug!(operation, claim = %requirement.claim, ?missing, "denied: insufficient capabilities");
                return Decision::Denied(DenialReason::InsufficientCapabilities {
                    claim: requirement.claim.clone(),
                    missing,
                });
            }
        }

        Decision::Granted
    }
}

impl Default for AccessControlManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AccessControlManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControlManager")
            .field("claims", &self.families.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
