//! Claim values, ordered claim maps, and the claim translation registry
//!
//! The manager translates string, integer, float, and boolean claim values
//! automatically. Everything else (arrays, objects, application types)
//! needs a [`ClaimCodec`] registered for the claim name; the registry ships
//! with one pre-registered codec for `aud`, which the JWT spec permits to
//! be either a single string or an array of strings on the wire.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CodecError, TokenError, TokenResult};

/// An application-defined claim value produced by a registered codec.
///
/// Blanket-implemented for anything debuggable and thread-safe; consumers
/// recover the concrete type through [`ClaimValue::downcast_ref`].
pub trait CustomClaim: Any + fmt::Debug + Send + Sync {
    /// The value as `Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> CustomClaim for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An in-memory claim or header value.
///
/// Primitive variants round-trip without a codec. `Json` holds wire shapes
/// that no codec claimed, so unseen fields survive a parse untouched.
/// `Custom` carries whatever a registered codec produced.
#[derive(Debug, Clone)]
pub enum ClaimValue {
    /// A string, subject to the StringOrURI rule at encoding time
    String(String),
    /// A whole number; timing claims are carried this way
    Integer(i64),
    /// A fractional number
    Float(f64),
    /// A boolean
    Bool(bool),
    /// A list of strings, as used by `aud`
    StringList(Vec<String>),
    /// An opaque json element preserved from parsing
    Json(Value),
    /// A codec-produced application value
    Custom(Arc<dyn CustomClaim>),
}

impl ClaimValue {
    /// The value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a float; integers widen.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ClaimValue::Float(n) => Some(*n),
            ClaimValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClaimValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a list of strings, if it is one.
    #[must_use]
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            ClaimValue::StringList(items) => Some(items),
            _ => None,
        }
    }

    /// Downcast a `Custom` value to its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ClaimValue::Custom(value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for ClaimValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ClaimValue::String(a), ClaimValue::String(b)) => a == b,
            (ClaimValue::Integer(a), ClaimValue::Integer(b)) => a == b,
            (ClaimValue::Float(a), ClaimValue::Float(b)) => a == b,
            (ClaimValue::Bool(a), ClaimValue::Bool(b)) => a == b,
            (ClaimValue::StringList(a), ClaimValue::StringList(b)) => a == b,
            (ClaimValue::Json(a), ClaimValue::Json(b)) => a == b,
            // custom values have no general equality; identity is the best we can do
            (ClaimValue::Custom(a), ClaimValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Integer(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(value: Vec<String>) -> Self {
        ClaimValue::StringList(value)
    }
}

/// A map of claim or header names to values that remembers insertion
/// order.
///
/// Order matters: the serialized token renders members in the order they
/// were inserted, which keeps generation byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimMap {
    entries: Vec<(String, ClaimValue)>,
}

impl ClaimMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one if the name was already
    /// present. Replacement keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Option<ClaimValue> {
        let name = name.into();
        let value = value.into();
        for entry in &mut self.entries {
            if entry.0 == name {
                return Some(std::mem::replace(&mut entry.1, value));
            }
        }
        self.entries.push((name, value));
        None
    }

    /// Look up a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, value)| value)
    }

    /// True if the map holds the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, ClaimValue)> for ClaimMap {
    fn from_iter<I: IntoIterator<Item = (String, ClaimValue)>>(iter: I) -> Self {
        let mut map = ClaimMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Bidirectional translation between an in-memory claim value and its json
/// element for one claim name.
pub trait ClaimCodec: Send + Sync {
    /// Render the value as a json element.
    fn to_json(&self, value: &ClaimValue) -> Result<Value, CodecError>;

    /// Read the value back from a json element.
    fn from_json(&self, value: &Value) -> Result<ClaimValue, CodecError>;
}

/// Per-claim-name codec registry.
///
/// Registration happens in a single setup phase before the manager is
/// constructed; the manager takes the registry by value, so readers always
/// see a consistent snapshot.
pub struct ClaimCodecRegistry {
    codecs: HashMap<String, Arc<dyn ClaimCodec>>,
}

impl ClaimCodecRegistry {
    /// Create a registry with the `aud` codec pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let mut codecs: HashMap<String, Arc<dyn ClaimCodec>> = HashMap::new();
        codecs.insert("aud".to_string(), Arc::new(AudienceCodec));
        Self { codecs }
    }

    /// Register a codec for a claim (or header) name.
    ///
    /// Fails with [`TokenError::Configuration`] if the name is empty or a
    /// codec is already registered for it.
    pub fn register(&mut self, claim_name: &str, codec: Arc<dyn ClaimCodec>) -> TokenResult<()> {
        if claim_name.is_empty() {
            return Err(TokenError::configuration("need a claim name to register a codec"));
        }
        if self.codecs.contains_key(claim_name) {
            return Err(TokenError::configuration(format!(
                "a codec was already registered for claim '{claim_name}'"
            )));
        }
        self.codecs.insert(claim_name.to_string(), codec);
        Ok(())
    }

    pub(crate) fn codec(&self, claim_name: &str) -> Option<&Arc<dyn ClaimCodec>> {
        self.codecs.get(claim_name)
    }
}

impl Default for ClaimCodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClaimCodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimCodecRegistry")
            .field("claims", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Codec for the `aud` claim.
///
/// The JWT spec allows `aud` to appear as either a single string or an
/// array of strings. Reading accepts both and normalizes to a list;
/// writing always emits the array form.
struct AudienceCodec;

impl ClaimCodec for AudienceCodec {
    fn to_json(&self, value: &ClaimValue) -> Result<Value, CodecError> {
        match value {
            ClaimValue::StringList(items) => Ok(Value::Array(
                items.iter().map(|item| Value::String(item.clone())).collect(),
            )),
            // a lone string coerces to a single-element array
            ClaimValue::String(item) => Ok(Value::Array(vec![Value::String(item.clone())])),
            other => Err(format!("expected a string or list of strings, got {other:?}").into()),
        }
    }

    fn from_json(&self, value: &Value) -> Result<ClaimValue, CodecError> {
        match value {
            Value::String(item) => Ok(ClaimValue::StringList(vec![item.clone()])),
            Value::Array(items) => {
                let mut audiences = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(audience) => audiences.push(audience.clone()),
                        other => {
                            return Err(
                                format!("audience entries must be strings, got {other}").into()
                            )
                        }
                    }
                }
                Ok(ClaimValue::StringList(audiences))
            }
            other => Err(format!("expected a string or array of strings, got {other}").into()),
        }
    }
}
