//! Tree navigation errors.

use thiserror::Error;

/// Errors from moving a tree's cursor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// `pop()` was called with no saved state to restore.
    #[error("cannot pop past the root: navigation stack is empty")]
    EmptyStack,
}
