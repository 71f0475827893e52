//! # jsref-core — Addressing Primitives for Schema References
//!
//! This crate is the leaf of the jsref workspace. It defines the values that
//! every other crate passes around when a schema refers to part of itself or
//! to another document.
//!
//! ## Key Design Principles
//!
//! 1. **Immutable addresses.** `JsonPointer` and `JsonRef` never change after
//!    construction; `append`, `join` and `resolve` return new values.
//!
//! 2. **Misses are values, not errors.** `JsonPointer::get` returns `None`
//!    for anything it cannot reach. Only malformed *text* is an error.
//!
//! 3. **Closed variant sets.** Reference resolution dispatches on a closed
//!    enum (empty, hierarchical, archive) by exhaustive `match`.
//!
//! 4. **One notion of document equality.** `CanonicalBytes` (RFC 8785) is
//!    the normalized form used for equality, hashing and content digests,
//!    so `1` and `1.0` are the same number everywhere.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jsref-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod pointer;
pub mod reference;
pub mod uri;

// Re-export primary types for ergonomic imports.
pub use canonical::{canonical_eq, CanonicalBytes};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, PointerError, RefError};
pub use pointer::{escape_token, JsonPointer};
pub use reference::{JsonRef, RefFragment, RefKind};
pub use uri::{validate_scheme, UriRef};
