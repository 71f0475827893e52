//! # Canonical Serialization — Value Equality Across Numeric Forms
//!
//! `serde_json::Value` distinguishes `1` from `1.0`. A schema registry must
//! not: the cache, uniqueness checks and "have I seen this document" tests
//! all compare documents by mathematical value. This module defines
//! `CanonicalBytes`, the single normalized representation used for those
//! comparisons.
//!
//! ## Normalization
//!
//! Serialization uses `serde_jcs` (RFC 8785, JSON Canonicalization Scheme):
//! object keys sorted, compact separators, and numbers written in their
//! shortest ECMAScript form, so integer-valued floats serialize exactly like
//! the corresponding integer.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by RFC 8785 canonicalization.
///
/// The inner `Vec<u8>` is private; the only constructors go through
/// `serde_jcs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be serialized.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let s = serde_jcs::to_string(obj)?;
        Ok(Self(s.into_bytes()))
    }

    /// Canonicalize a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if JCS
    /// serialization fails.
    pub fn from_value(value: &Value) -> Result<Self, CanonicalizationError> {
        Self::new(value)
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compare two values by their canonical form.
///
/// Falls back to structural equality if either side fails to canonicalize.
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    match (CanonicalBytes::from_value(a), CanonicalBytes::from_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
