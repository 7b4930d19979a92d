//! Capability requirement declarations
//!
//! A requirement names a claim and the capabilities a caller must hold in
//! that claim's family. Operations declare a list of requirements at
//! registration time; the evaluator checks them against verified tokens.

/// The capabilities of one family required from one claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequirement {
    claim: String,
    capabilities: Vec<String>,
}

impl CapabilityRequirement {
    /// Declare that `claim` must hold every one of `capabilities`.
    #[must_use]
    pub fn new(
        claim: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            claim: claim.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// The claim the capabilities are found within. This is not the same
    /// as the family; the family is whatever was registered for the claim.
    #[must_use]
    pub fn claim(&self) -> &str {
        &self.claim
    }

    /// The required capability names.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
}
