//! JSON web token generation, parsing, and claim translation
//!
//! This crate is the token side of the Tales security stack:
//! - compact JWS serialization with unpadded base64url segments
//! - HMAC signing (HS256, HS384, HS512) plus explicit `none`
//! - a per-claim codec registry that translates application types to and
//!   from json, with automatic handling of json primitives
//! - a manager that generates tokens from claim maps and parses inbound
//!   strings, recording signature verification as state rather than
//!   raising on it
//!
//! Policy questions (expiry, capabilities) live with the caller; see the
//! companion access-control crate for the capability evaluator.

mod algorithm;
mod claim;
mod clock;
pub mod codec;
mod config;
mod error;
mod manager;
mod token;

pub use algorithm::SigningAlgorithm;
pub use claim::{ClaimCodec, ClaimCodecRegistry, ClaimMap, ClaimValue, CustomClaim};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GenerationConfiguration;
pub use error::{CodecError, TokenError, TokenResult};
pub use manager::TokenManager;
pub use token::JsonWebToken;
