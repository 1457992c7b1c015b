//! Per-transaction state.

use crate::document::Document;
use crate::types::TransactionId;

/// One node of the transaction chain.
#[derive(Debug, Clone)]
pub(crate) struct TransactionNode {
    /// Private snapshot of the document.
    pub(crate) document: Document,
    /// The transaction this one was opened from; `None` only for the root.
    pub(crate) parent: Option<TransactionId>,
    /// The single nested transaction opened from this one, if any.
    pub(crate) child: Option<TransactionId>,
    /// Set by any collection write; only cleared by a successful flush.
    pub(crate) dirty: bool,
}

impl TransactionNode {
    /// Creates the root node over a loaded document.
    pub(crate) fn root(document: Document) -> Self {
        Self {
            document,
            parent: None,
            child: None,
            dirty: false,
        }
    }

    /// Creates a nested node over a snapshot of its parent.
    pub(crate) fn nested(parent: TransactionId, snapshot: Document) -> Self {
        Self {
            document: snapshot,
            parent: Some(parent),
            child: None,
            dirty: false,
        }
    }

    /// Returns true if no transaction is nested under this one.
    pub(crate) fn is_leaf(&self) -> bool {
        self.child.is_none()
    }
}
