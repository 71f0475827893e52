//! # Schema Tree — Cursor and Resolution Scope
//!
//! A `SchemaTree` pairs a loaded document with a movable cursor. As the
//! cursor descends, every node it passes through that declares an `id`
//! changes the *resolution scope*: the reference against which `$ref`
//! strings found below that node are resolved.
//!
//! ## Invariant
//!
//! `current_ref` always equals `loading_ref` composed, in order, with the
//! `id` of every node on the path from the root to the cursor.
//!
//! ## Navigation
//!
//! Moves save the prior (pointer, scope) pair on a stack so they can be
//! undone with [`SchemaTree::pop`]. The stack belongs to one walker; to
//! branch a walk, [`SchemaTree::fork`] produces an independent cursor over
//! the same shared document with an empty stack.

use std::sync::Arc;

use jsref_core::{JsonPointer, JsonRef};
use serde_json::Value;

use crate::deref::{Dereferencing, RefIndex};
use crate::error::TreeError;

/// The member that changes resolution scope.
pub const ID_KEYWORD: &str = "id";

/// The reference declared by a node's `id` member.
///
/// Returns `None` unless the node is an object whose `id` is a string that
/// parses as a reference.
pub fn node_id(node: &Value) -> Option<JsonRef> {
    let id = node.as_object()?.get(ID_KEYWORD)?.as_str()?;
    JsonRef::parse(id).ok()
}

#[derive(Debug, Clone)]
struct Frame {
    pointer: JsonPointer,
    current_ref: JsonRef,
}

/// A document plus a cursor that tracks the current resolution scope.
#[derive(Debug)]
pub struct SchemaTree {
    base: Arc<Value>,
    loading_ref: JsonRef,
    root_ref: JsonRef,
    pointer: JsonPointer,
    current_ref: JsonRef,
    stack: Vec<Frame>,
    index: Arc<RefIndex>,
}

impl SchemaTree {
    /// Create a tree for a document obtained under `loading_ref`.
    ///
    /// If the root declares an `id`, it is composed onto `loading_ref` to
    /// form the initial scope. With [`Dereferencing::Inline`] the whole
    /// document is indexed here.
    pub fn new(
        loading_ref: JsonRef,
        document: impl Into<Arc<Value>>,
        strategy: Dereferencing,
    ) -> Self {
        let base = document.into();
        let root_ref = match node_id(&base) {
            Some(id) => loading_ref.resolve(&id),
            None => loading_ref.clone(),
        };
        let index = Arc::new(RefIndex::build(strategy, &loading_ref, &base));
        Self {
            base,
            loading_ref,
            current_ref: root_ref.clone(),
            root_ref,
            pointer: JsonPointer::root(),
            stack: Vec::new(),
            index,
        }
    }

    /// Create a tree for an in-memory document with an empty loading reference.
    pub fn from_value(document: impl Into<Arc<Value>>, strategy: Dereferencing) -> Self {
        Self::new(JsonRef::empty(), document, strategy)
    }

    /// The whole document.
    pub fn base(&self) -> &Arc<Value> {
        &self.base
    }

    /// The reference this document was obtained under.
    pub fn loading_ref(&self) -> &JsonRef {
        &self.loading_ref
    }

    /// The cursor position.
    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    /// The resolution scope at the cursor.
    pub fn current_ref(&self) -> &JsonRef {
        &self.current_ref
    }

    /// The strategy this tree was built with.
    pub fn dereferencing(&self) -> Dereferencing {
        self.index.strategy()
    }

    /// Number of `id` nodes indexed at construction (inline only).
    pub fn indexed_ids(&self) -> usize {
        self.index.len()
    }

    /// Number of saved states on the navigation stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The node at the cursor, or `None` if the cursor is on a missing node.
    pub fn node(&self) -> Option<&Value> {
        self.pointer.get(&self.base)
    }

    /// The node at an absolute pointer.
    pub fn node_at(&self, pointer: &JsonPointer) -> Option<&Value> {
        pointer.get(&self.base)
    }

    /// Where the cursor is, as a reference into the loading document.
    pub fn location(&self) -> JsonRef {
        self.loading_ref.with_pointer(&self.pointer)
    }

    /// Move the cursor down by a relative pointer.
    pub fn push(&mut self, relative: &JsonPointer) {
        self.save();
        self.descend(relative);
    }

    /// Move the cursor down by one object member.
    pub fn push_token(&mut self, token: impl Into<String>) {
        self.push(&JsonPointer::from_tokens([token.into()]));
    }

    /// Move the cursor down by one array element.
    pub fn push_index(&mut self, index: usize) {
        self.push(&JsonPointer::root().append_index(index));
    }

    /// Move the cursor to an absolute pointer, recomputing scope from the root.
    pub fn jump_to(&mut self, absolute: &JsonPointer) {
        self.save();
        self.pointer = JsonPointer::root();
        self.current_ref = self.root_ref.clone();
        self.descend(absolute);
    }

    /// Undo the most recent move.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::EmptyStack` if there is nothing to undo.
    pub fn pop(&mut self) -> Result<(), TreeError> {
        let frame = self.stack.pop().ok_or(TreeError::EmptyStack)?;
        self.pointer = frame.pointer;
        self.current_ref = frame.current_ref;
        Ok(())
    }

    /// Resolve a reference against the scope at the cursor.
    ///
    /// This is how a `$ref` string becomes an absolute reference.
    pub fn resolve(&self, other: &JsonRef) -> JsonRef {
        self.current_ref.resolve(other)
    }

    /// Returns true if the strategy says `reference` lives in this document.
    pub fn contains_ref(&self, reference: &JsonRef) -> bool {
        self.index.contains(&self.loading_ref, reference)
    }

    /// Where `reference` points in this document, if it exists here.
    pub fn locate(&self, reference: &JsonRef) -> Option<JsonPointer> {
        self.index.locate(&self.loading_ref, &self.base, reference)
    }

    /// An independent cursor at the same position with an empty stack.
    pub fn fork(&self) -> Self {
        Self {
            base: Arc::clone(&self.base),
            loading_ref: self.loading_ref.clone(),
            root_ref: self.root_ref.clone(),
            pointer: self.pointer.clone(),
            current_ref: self.current_ref.clone(),
            stack: Vec::new(),
            index: Arc::clone(&self.index),
        }
    }

    fn save(&mut self) {
        self.stack.push(Frame {
            pointer: self.pointer.clone(),
            current_ref: self.current_ref.clone(),
        });
    }

    fn descend(&mut self, relative: &JsonPointer) {
        for token in relative.tokens() {
            self.pointer = self.pointer.append(token.as_str());
            let Some(id) = self.pointer.get(&self.base).and_then(node_id) else {
                continue;
            };
            self.current_ref = self.current_ref.resolve(&id);
            tracing::trace!(
                pointer = %self.pointer,
                scope = %self.current_ref,
                "entered resolution scope"
            );
        }
    }
}
