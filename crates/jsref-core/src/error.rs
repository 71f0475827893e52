//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types produced by the addressing primitives. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Parse errors carry the offending input (and offset where it is known).
//! - Lookup misses are never errors: `JsonPointer::get` and tree lookups
//!   return `Option`, so callers can tell "absent" from "malformed".

use thiserror::Error;

/// Error parsing the text form of a JSON Pointer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// Non-empty pointer text must begin with `/`.
    #[error("JSON Pointer {input:?} must be empty or start with '/'")]
    NoLeadingSlash {
        /// The rejected pointer text.
        input: String,
    },

    /// A `~` was not followed by `0` or `1`.
    #[error("bad escape at offset {offset} in JSON Pointer {input:?}: '~' must be followed by '0' or '1'")]
    BadEscape {
        /// The rejected pointer text.
        input: String,
        /// Byte offset of the offending `~`.
        offset: usize,
    },
}

/// Error parsing or using a URI reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    /// The text is not a syntactically valid URI reference.
    #[error("invalid URI {input:?}: {reason}")]
    InvalidUri {
        /// The rejected URI text.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A scheme does not match `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
    #[error("illegal URI scheme {scheme:?}")]
    IllegalScheme {
        /// The rejected scheme.
        scheme: String,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
