//! Capability-based authorization over verified json web tokens
//!
//! This crate is the policy side of the Tales security stack. Capability
//! names are grouped into ordered, immutable families; a token claim
//! carries a subset of one family as a compact bitset; operations declare
//! which capabilities they require; and the evaluator turns a parsed
//! token plus an operation name into a granted-or-denied decision with a
//! concrete reason.
//!
//! Setup happens once: build families, bind them to claim names (which
//! also wires the wire-format codec into the token manager's registry),
//! and register each operation's requirements. After that the manager is
//! immutable and safe to share across request handlers.

mod capability;
mod error;
mod manager;
mod requirements;

pub use capability::{
    CapabilityClaimCodec, CapabilityFamily, CapabilityFamilyBuilder, CapabilitySet,
};
pub use error::{AccessControlError, AccessControlResult};
pub use manager::{AccessControlManager, Decision, DenialReason};
pub use requirements::CapabilityRequirement;
