//! # Ref Resolver — Following `$ref` Chains
//!
//! A node of the form `{"$ref": "..."}` stands for the node its reference
//! designates, which may itself be a `$ref`. [`RefResolver::resolve`]
//! follows such a chain until it reaches a node that is not a reference.
//!
//! ## Loop Detection
//!
//! Every hop lands on a (document, pointer) pair. A loaded document is
//! identified by its cache key (the redirect target of its locator), not by
//! its address: with a small or zero-sized cache the same URI may come back
//! as a fresh `Arc` on every hop. An in-memory document has no URI and is
//! identified by the digest of its canonical form. Landing on the same pair
//! twice is a loop and is reported as [`ResolveError::RefLoop`].
//!
//! The chain is also bounded by `max_depth` hops.

use std::collections::HashSet;
use std::sync::Arc;

use jsref_core::{sha256_digest, CanonicalBytes, ContentDigest, JsonPointer, JsonRef};
use jsref_tree::SchemaTree;
use serde_json::Value;

use crate::error::ResolveError;
use crate::registry::SchemaLoader;

/// The member holding a JSON Reference.
pub const REF_KEYWORD: &str = "$ref";

/// Default bound on the number of hops in one chain.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Members whose values are instance data rather than schemas.
const DATA_KEYWORDS: &[&str] = &["enum", "default"];

/// Members whose values map user-chosen names to schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "dependencies",
];

/// The end of a `$ref` chain.
#[derive(Debug)]
pub struct ResolvedSchema {
    /// Tree positioned on the first node that is not a `$ref`.
    pub tree: SchemaTree,
    /// Every absolute reference followed, in order.
    pub chain: Vec<JsonRef>,
}

impl ResolvedSchema {
    /// The node the chain ended on.
    pub fn node(&self) -> Option<&Value> {
        self.tree.node()
    }

    /// Returns true if the starting node was not a `$ref`.
    pub fn is_direct(&self) -> bool {
        self.chain.is_empty()
    }
}

/// Outcome of resolving one `$ref` site found by [`RefResolver::check_refs`].
#[derive(Debug)]
pub struct RefCheck {
    /// Where the `$ref` member sits.
    pub pointer: JsonPointer,
    /// The raw `$ref` text.
    pub raw: String,
    /// The final location on success.
    pub outcome: Result<JsonRef, ResolveError>,
}

impl RefCheck {
    /// Returns true if the chain ended on a concrete node.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Identity of a document within one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocumentKey {
    /// Loaded through the loader, by cache key.
    Located(String),
    /// In memory, by content.
    Content(ContentDigest),
    /// In memory and not canonicalizable, by address. The walk never
    /// returns to an in-memory document after leaving it, so a reused
    /// address cannot collide.
    Address(usize),
}

/// Follows `$ref` chains across documents using a [`SchemaLoader`].
#[derive(Debug, Clone, Copy)]
pub struct RefResolver<'a> {
    loader: &'a SchemaLoader,
    max_depth: usize,
}

impl<'a> RefResolver<'a> {
    /// A resolver with the default depth bound.
    pub fn new(loader: &'a SchemaLoader) -> Self {
        Self {
            loader,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Change the bound on chain length.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The bound on chain length.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Follow the `$ref` chain starting at the tree's cursor.
    ///
    /// A starting node that is not a `$ref` resolves to itself with an
    /// empty chain.
    ///
    /// # Errors
    ///
    /// - `ResolveError::InvalidRef` if a `$ref` string does not parse.
    /// - `ResolveError::Load` if a document on the chain cannot be loaded.
    /// - `ResolveError::Unresolvable` if a target node does not exist.
    /// - `ResolveError::RefLoop` if the chain revisits a node.
    /// - `ResolveError::DepthExceeded` if the chain is longer than `max_depth`.
    pub fn resolve(&self, mut tree: SchemaTree) -> Result<ResolvedSchema, ResolveError> {
        let mut chain: Vec<JsonRef> = Vec::new();
        let mut visited: HashSet<(DocumentKey, JsonPointer)> = HashSet::new();
        let mut document: Option<DocumentKey> = None;

        while let Some(raw) = ref_at_cursor(&tree) {
            let reference = JsonRef::parse(&raw).map_err(|source| ResolveError::InvalidRef {
                raw: raw.clone(),
                at: tree.pointer().clone(),
                source,
            })?;
            let target = tree.resolve(&reference);

            if chain.len() >= self.max_depth {
                return Err(ResolveError::DepthExceeded {
                    max_depth: self.max_depth,
                    reference: target,
                });
            }

            let site = tree.location();
            if !tree.contains_ref(&target) {
                tracing::debug!(site = %site, target = %target, "following $ref into another document");
                tree = self.loader.get_ref(&target.to_locator())?;
                document = None;
            }

            let Some(pointer) = tree.locate(&target) else {
                return Err(ResolveError::Unresolvable {
                    reference: target,
                    site,
                });
            };

            chain.push(target);
            let key = document
                .get_or_insert_with(|| self.document_key(&tree))
                .clone();
            if !visited.insert((key, pointer.clone())) {
                return Err(ResolveError::RefLoop { chain });
            }
            tree.jump_to(&pointer);
        }

        Ok(ResolvedSchema { tree, chain })
    }

    /// Resolve every `$ref` in the tree's document.
    ///
    /// Sites are visited in document order. Values of `enum` and `default`
    /// are instance data and are not searched. Each site is resolved on a
    /// fork of `tree`, which itself is left untouched.
    pub fn check_refs(&self, tree: &SchemaTree) -> Vec<RefCheck> {
        let mut checks = Vec::new();
        for (pointer, raw) in ref_sites(tree.base()) {
            let mut fork = tree.fork();
            fork.jump_to(&pointer);
            let outcome = self
                .resolve(fork)
                .map(|resolved| resolved.tree.location());
            if let Err(e) = &outcome {
                tracing::debug!(pointer = %pointer, "unresolved $ref: {e}");
            }
            checks.push(RefCheck {
                pointer,
                raw,
                outcome,
            });
        }
        checks
    }

    fn document_key(&self, tree: &SchemaTree) -> DocumentKey {
        if !tree.loading_ref().locator().is_empty() {
            return DocumentKey::Located(self.loader.cache_key(tree.loading_ref()));
        }
        match CanonicalBytes::from_value(tree.base()) {
            Ok(bytes) => DocumentKey::Content(sha256_digest(&bytes)),
            Err(_) => DocumentKey::Address(Arc::as_ptr(tree.base()) as usize),
        }
    }
}

fn ref_at_cursor(tree: &SchemaTree) -> Option<String> {
    tree.node()?
        .as_object()?
        .get(REF_KEYWORD)?
        .as_str()
        .map(str::to_string)
}

/// Every object holding a string `$ref`, in document order.
fn ref_sites(document: &Value) -> Vec<(JsonPointer, String)> {
    let mut sites = Vec::new();
    // (pointer, node, whether member names of this node are keywords)
    let mut pending = vec![(JsonPointer::root(), document, true)];

    while let Some((pointer, node, keyword_position)) = pending.pop() {
        match node {
            Value::Object(members) => {
                if let Some(raw) = members.get(REF_KEYWORD).and_then(Value::as_str) {
                    sites.push((pointer.clone(), raw.to_string()));
                }
                for (key, child) in members.iter().rev() {
                    if keyword_position && DATA_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }
                    let child_is_map =
                        keyword_position && SCHEMA_MAP_KEYWORDS.contains(&key.as_str());
                    pending.push((pointer.append(key.as_str()), child, !child_is_map));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate().rev() {
                    pending.push((pointer.append_index(i), child, true));
                }
            }
            _ => {}
        }
    }
    sites
}
