//! # jsref-tree — Navigable Schema Trees
//!
//! A `SchemaTree` is a loaded document plus a cursor. The cursor tracks the
//! resolution scope implied by every `id` between the root and the current
//! node, so that `$ref` strings are resolved against the right base.
//!
//! The dereferencing strategy chosen at construction decides which
//! references a tree can answer by itself:
//!
//! | Strategy    | Inside the tree when                                     |
//! |-------------|----------------------------------------------------------|
//! | `canonical` | the reference's locator equals the loading reference's   |
//! | `inline`    | the above, or it matches an `id` found anywhere in the tree |
//!
//! ## Crate Policy
//!
//! - Depends only on `jsref-core`.
//! - Trees never load documents. Deciding what to fetch is the loader's job.
//! - Documents are shared behind `Arc` and never mutated.

pub mod deref;
pub mod error;
pub mod tree;

pub use deref::Dereferencing;
pub use error::TreeError;
pub use tree::{node_id, SchemaTree, ID_KEYWORD};
