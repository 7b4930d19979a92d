//! Capability families and capability sets
//!
//! A family is a named, ordered, closed collection of capability names;
//! sealing it fixes a zero-based ordinal for every member. A capability
//! set is a subset of one family held as a bitset over those ordinals, so
//! request-time checks are word-wide AND/compare operations rather than
//! string work. On the wire a set appears as a json array of member names
//! in family order; the codec in this module plugs that form into the
//! token manager's claim registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tales_jwt::{ClaimCodec, ClaimValue, CodecError};

use crate::error::{AccessControlError, AccessControlResult};

const WORD_BITS: usize = u64::BITS as usize;

/// A named, ordered, immutable collection of capability names.
///
/// Built once at startup through [`CapabilityFamily::builder`] and shared
/// behind an `Arc`; set membership and ordinals never change afterwards.
pub struct CapabilityFamily {
    name: String,
    capabilities: Vec<String>,
    ordinals: HashMap<String, usize>,
}

impl CapabilityFamily {
    /// Start building a family with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> CapabilityFamilyBuilder {
        CapabilityFamilyBuilder {
            name: name.into(),
            capabilities: Vec::new(),
        }
    }

    /// The family name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of capabilities in the family.
    #[must_use]
    pub fn size(&self) -> usize {
        self.capabilities.len()
    }

    /// Capability names in ordinal order.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    /// The stable ordinal of a capability, if it belongs to the family.
    #[must_use]
    pub fn ordinal(&self, capability: &str) -> Option<usize> {
        self.ordinals.get(capability).copied()
    }

    /// An empty set over this family.
    #[must_use]
    pub fn empty_set(self: &Arc<Self>) -> CapabilitySet {
        CapabilitySet {
            family: Arc::clone(self),
            words: vec![0; self.size().div_ceil(WORD_BITS)],
        }
    }

    /// A set over this family holding exactly the given capabilities.
    pub fn set_of<'a>(
        self: &Arc<Self>,
        capabilities: impl IntoIterator<Item = &'a str>,
    ) -> AccessControlResult<CapabilitySet> {
        let mut set = self.empty_set();
        for capability in capabilities {
            set.grant(capability)?;
        }
        Ok(set)
    }
}

impl fmt::Debug for CapabilityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityFamily")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Builder that appends capability names in ordinal order.
pub struct CapabilityFamilyBuilder {
    name: String,
    capabilities: Vec<String>,
}

impl CapabilityFamilyBuilder {
    /// Append a capability; its ordinal is its position in the build
    /// sequence.
    #[must_use]
    pub fn capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.push(name.into());
        self
    }

    /// Seal the family. Fails if the family name or any capability name
    /// is empty, or if a capability repeats.
    pub fn build(self) -> AccessControlResult<Arc<CapabilityFamily>> {
        if self.name.is_empty() {
            return Err(AccessControlError::configuration(
                "capability family needs a name",
            ));
        }
        let mut ordinals = HashMap::with_capacity(self.capabilities.len());
        for (ordinal, capability) in self.capabilities.iter().enumerate() {
            if capability.is_empty() {
                return Err(AccessControlError::configuration(format!(
                    "family '{}' has an empty capability name",
                    self.name
                )));
            }
            if ordinals.insert(capability.clone(), ordinal).is_some() {
                return Err(AccessControlError::configuration(format!(
                    "capability '{}' appears more than once in family '{}'",
                    capability, self.name
                )));
            }
        }
        Ok(Arc::new(CapabilityFamily {
            name: self.name,
            capabilities: self.capabilities,
            ordinals,
        }))
    }
}

/// A subset of one family's capabilities, stored as a bitset over the
/// family's ordinals.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    family: Arc<CapabilityFamily>,
    words: Vec<u64>,
}

impl CapabilitySet {
    /// The family this set is defined over.
    #[must_use]
    pub fn family(&self) -> &Arc<CapabilityFamily> {
        &self.family
    }

    /// Add a capability by name.
    pub fn grant(&mut self, capability: &str) -> AccessControlResult<()> {
        let ordinal = self.family.ordinal(capability).ok_or_else(|| {
            AccessControlError::unknown_capability(self.family.name(), capability)
        })?;
        self.words[ordinal / WORD_BITS] |= 1 << (ordinal % WORD_BITS);
        Ok(())
    }

    /// True if the named capability is held. Names outside the family are
    /// simply not held.
    #[must_use]
    pub fn has(&self, capability: &str) -> bool {
        match self.family.ordinal(capability) {
            Some(ordinal) => self.words[ordinal / WORD_BITS] & (1 << (ordinal % WORD_BITS)) != 0,
            None => false,
        }
    }

    /// True if every capability in `required` is held. Sets over
    /// different families never contain one another.
    #[must_use]
    pub fn contains_all(&self, required: &CapabilitySet) -> bool {
        if !Arc::ptr_eq(&self.family, &required.family) {
            return false;
        }
        self.words
            .iter()
            .zip(required.words.iter())
            .all(|(held, needed)| held & needed == *needed)
    }

    /// True if no capability is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Held capability names, in family order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.family
            .capabilities()
            .filter(|capability| self.has(capability))
            .collect()
    }
}

impl PartialEq for CapabilitySet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.family, &other.family) && self.words == other.words
    }
}

impl Eq for CapabilitySet {}

/// Claim codec that carries a capability set as a json array of member
/// names in family order.
///
/// Register one per capability-bearing claim in the token manager's
/// registry; parsing then yields `ClaimValue::Custom` values that
/// downcast to [`CapabilitySet`].
pub struct CapabilityClaimCodec {
    family: Arc<CapabilityFamily>,
}

impl CapabilityClaimCodec {
    /// Create a codec bound to a family.
    #[must_use]
    pub fn new(family: Arc<CapabilityFamily>) -> Self {
        Self { family }
    }
}

impl ClaimCodec for CapabilityClaimCodec {
    fn to_json(&self, value: &ClaimValue) -> Result<Value, CodecError> {
        // the natural write form is a set, but a plain list of names is
        // accepted for callers assembling claims by hand
        let set = match value {
            ClaimValue::Custom(_) => match value.downcast_ref::<CapabilitySet>() {
                Some(set) => set.clone(),
                None => {
                    return Err(format!(
                        "expected a capability set of family '{}'",
                        self.family.name()
                    )
                    .into())
                }
            },
            ClaimValue::StringList(names) => self
                .family
                .set_of(names.iter().map(String::as_str))
                .map_err(|e| -> CodecError { e.into() })?,
            other => {
                return Err(format!(
                    "expected a capability set of family '{}', got {other:?}",
                    self.family.name()
                )
                .into())
            }
        };
        if !Arc::ptr_eq(set.family(), &self.family) {
            return Err(format!(
                "capability set belongs to family '{}', not '{}'",
                set.family().name(),
                self.family.name()
            )
            .into());
        }
        Ok(Value::Array(
            set.names()
                .into_iter()
                .map(|name| Value::String(name.to_string()))
                .collect(),
        ))
    }

    fn from_json(&self, value: &Value) -> Result<ClaimValue, CodecError> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(format!("expected an array of capability names, got {other}").into())
            }
        };
        let mut set = self.family.empty_set();
        for item in items {
            match item {
                Value::String(name) => set
                    .grant(name)
                    .map_err(|e| -> CodecError { e.into() })?,
                other => {
                    return Err(format!("capability names must be strings, got {other}").into())
                }
            }
        }
        Ok(ClaimValue::Custom(Arc::new(set)))
    }
}
