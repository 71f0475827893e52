//! # Dereferencing Strategies
//!
//! Answers "does this tree contain reference R, and if so where".
//!
//! - **Canonical** trusts only the URI the document was loaded under. A
//!   reference is inside the tree when its locator equals the loading
//!   reference's locator; its pointer fragment is then used directly.
//!   Anything else goes to the loader.
//! - **Inline** walks the whole document once at construction and indexes
//!   every node carrying an `id`, keyed by the fully composed reference.
//!   Intra-document references to those ids never leave the tree.

use std::fmt;

use jsref_core::{JsonPointer, JsonRef, RefFragment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::node_id;

/// Which dereferencing strategy a tree uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dereferencing {
    /// URI-only lookups; unknown locators are deferred to the loader.
    #[default]
    Canonical,
    /// Eager `id` indexing of the whole document.
    Inline,
}

impl Dereferencing {
    /// Returns the strategy name as used in settings files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for Dereferencing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The per-document lookup structure built for a strategy.
#[derive(Debug)]
pub(crate) enum RefIndex {
    Canonical,
    Inline(Vec<IdEntry>),
}

/// One `id`-bearing node: its composed reference and where it sits.
#[derive(Debug, Clone)]
pub(crate) struct IdEntry {
    reference: JsonRef,
    pointer: JsonPointer,
}

impl RefIndex {
    pub(crate) fn build(strategy: Dereferencing, loading_ref: &JsonRef, base: &Value) -> Self {
        match strategy {
            Dereferencing::Canonical => Self::Canonical,
            Dereferencing::Inline => Self::Inline(index_ids(loading_ref, base)),
        }
    }

    pub(crate) fn strategy(&self) -> Dereferencing {
        match self {
            Self::Canonical => Dereferencing::Canonical,
            Self::Inline(_) => Dereferencing::Inline,
        }
    }

    /// Number of indexed `id` nodes (always zero for canonical).
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Canonical => 0,
            Self::Inline(entries) => entries.len(),
        }
    }

    pub(crate) fn contains(&self, loading_ref: &JsonRef, reference: &JsonRef) -> bool {
        match self {
            Self::Canonical => loading_ref.contains(reference),
            Self::Inline(entries) => {
                loading_ref.contains(reference) || match_entry(entries, reference).is_some()
            }
        }
    }

    pub(crate) fn locate(
        &self,
        loading_ref: &JsonRef,
        base: &Value,
        reference: &JsonRef,
    ) -> Option<JsonPointer> {
        let pointer = match self {
            Self::Canonical if loading_ref.contains(reference) => reference.pointer().cloned(),
            Self::Canonical => None,
            Self::Inline(entries) => match match_entry(entries, reference) {
                Some(pointer) => Some(pointer),
                None if loading_ref.contains(reference) => reference.pointer().cloned(),
                None => None,
            },
        }?;
        pointer.get(base).map(|_| pointer)
    }
}

/// Depth-first walk over container nodes recording every `id`.
fn index_ids(loading_ref: &JsonRef, base: &Value) -> Vec<IdEntry> {
    let mut entries = Vec::new();
    let mut pending = vec![(JsonPointer::root(), loading_ref.clone(), base)];

    while let Some((pointer, scope, node)) = pending.pop() {
        let scope = match node_id(node) {
            Some(id) => {
                let composed = scope.resolve(&id);
                entries.push(IdEntry {
                    reference: composed.clone(),
                    pointer: pointer.clone(),
                });
                composed
            }
            None => scope,
        };

        match node {
            Value::Object(members) => {
                for (key, child) in members.iter().rev() {
                    if child.is_object() || child.is_array() {
                        pending.push((pointer.append(key.as_str()), scope.clone(), child));
                    }
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate().rev() {
                    if child.is_object() || child.is_array() {
                        pending.push((pointer.append_index(i), scope.clone(), child));
                    }
                }
            }
            _ => {}
        }
    }

    entries
}

/// Find the node a reference designates through the `id` index.
///
/// An exact match wins. Otherwise the entry with the same locator whose
/// pointer fragment is the longest prefix of the reference's fragment is
/// used, and the remaining suffix is appended to the entry's node pointer.
/// Ties go to the entry met first in document order.
fn match_entry(entries: &[IdEntry], reference: &JsonRef) -> Option<JsonPointer> {
    if let Some(entry) = entries.iter().find(|e| &e.reference == reference) {
        return Some(entry.pointer.clone());
    }

    let RefFragment::Pointer(target) = reference.fragment() else {
        return None;
    };

    let mut best: Option<(&IdEntry, JsonPointer, usize)> = None;
    for entry in entries.iter().filter(|e| e.reference.contains(reference)) {
        let Some(prefix) = entry.reference.pointer() else {
            continue;
        };
        let Some(suffix) = prefix.relativize(target) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, _, len)| prefix.len() > *len) {
            best = Some((entry, suffix, prefix.len()));
        }
    }

    best.map(|(entry, suffix, _)| entry.pointer.join(&suffix))
}
