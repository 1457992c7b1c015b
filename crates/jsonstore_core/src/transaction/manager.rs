//! The transaction chain.

use crate::constraint;
use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use crate::transaction::state::TransactionNode;
use crate::types::TransactionId;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Arena of transaction nodes linked into a single chain.
///
/// The chain never branches: every node has at most one child, so the leaf
/// is reached by following `child` links and the root by following `parent`
/// links. Committed and rolled-back nodes are removed from the arena, so a
/// handle that outlives its node is inactive.
///
/// One mutex guards the whole arena. It is held only for the duration of a
/// single chain operation, including materializing a collection from a
/// snapshot, which keeps readers from racing the autosave thread.
pub(crate) struct TransactionChain {
    state: Mutex<ChainState>,
}

struct ChainState {
    nodes: HashMap<TransactionId, TransactionNode>,
    next_id: u64,
}

impl TransactionChain {
    /// Creates a chain whose root holds `document`.
    pub(crate) fn new(document: Document) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(TransactionId::ROOT, TransactionNode::root(document));
        Self {
            state: Mutex::new(ChainState {
                nodes,
                next_id: TransactionId::ROOT.as_u64() + 1,
            }),
        }
    }

    pub(crate) fn is_active(&self, id: TransactionId) -> bool {
        self.state.lock().is_active(id)
    }

    pub(crate) fn ensure_active(&self, id: TransactionId) -> CoreResult<()> {
        self.state.lock().ensure_active(id)
    }

    pub(crate) fn ensure_leaf(&self, id: TransactionId) -> CoreResult<()> {
        self.state.lock().ensure_leaf(id)
    }

    pub(crate) fn is_leaf(&self, id: TransactionId) -> bool {
        self.state.lock().ensure_leaf(id).is_ok()
    }

    pub(crate) fn is_dirty(&self, id: TransactionId) -> bool {
        self.state.lock().nodes.get(&id).is_some_and(|node| node.dirty)
    }

    pub(crate) fn level(&self, id: TransactionId) -> CoreResult<usize> {
        let state = self.state.lock();
        state.ensure_active(id)?;
        let mut level = 0;
        let mut current = state.node(id)?;
        while let Some(parent) = current.parent {
            level += 1;
            current = state.node(parent)?;
        }
        Ok(level)
    }

    /// Nesting depth of the whole chain (the leaf's level).
    pub(crate) fn depth(&self) -> usize {
        let state = self.state.lock();
        let mut depth = 0;
        let mut current = TransactionId::ROOT;
        while let Some(child) = state.nodes.get(&current).and_then(|node| node.child) {
            depth += 1;
            current = child;
        }
        depth
    }

    pub(crate) fn leaf(&self, id: TransactionId) -> CoreResult<TransactionId> {
        let state = self.state.lock();
        state.ensure_active(id)?;
        state.leaf_of(id)
    }

    pub(crate) fn parent(&self, id: TransactionId) -> Option<TransactionId> {
        self.state.lock().nodes.get(&id).and_then(|node| node.parent)
    }

    pub(crate) fn child(&self, id: TransactionId) -> Option<TransactionId> {
        self.state.lock().nodes.get(&id).and_then(|node| node.child)
    }

    /// Opens a nested transaction under `id`, which must be the leaf.
    pub(crate) fn begin(&self, id: TransactionId) -> CoreResult<TransactionId> {
        let mut state = self.state.lock();
        state.ensure_active(id)?;

        let parent = state.node(id)?;
        if let Some(child) = parent.child {
            return Err(CoreError::invalid_state(format!(
                "{id} already has an open nested transaction ({child}); begin from the leaf"
            )));
        }
        let snapshot = parent.document.clone();

        let child = TransactionId::new(state.next_id);
        state.next_id += 1;
        state
            .nodes
            .insert(child, TransactionNode::nested(id, snapshot));
        state.node_mut(id)?.child = Some(child);

        debug!(parent = %id, txn = %child, "began nested transaction");
        Ok(child)
    }

    /// Commits everything from the current leaf up to and including `id`.
    ///
    /// Nothing is merged unless validation passes; on a constraint violation
    /// the whole subtree stays open and linked.
    pub(crate) fn commit(&self, id: TransactionId) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_active(id)?;

        let merged: Vec<TransactionId> = state
            .path_from_leaf(id)?
            .into_iter()
            .filter(|node| !node.is_root())
            .collect();
        let Some(&leaf) = merged.first() else {
            debug!(txn = %id, "commit with nothing nested");
            return Ok(());
        };

        // Each merge overwrites the parent's snapshot wholesale, so every
        // level on the path ends up validating the leaf's snapshot.
        if let Err(err) = constraint::check(&state.node(leaf)?.document) {
            warn!(txn = %id, leaf = %leaf, error = %err, "commit rejected");
            return Err(err);
        }

        let target = state.node(id)?.parent.unwrap_or(id);
        let mut document = None;
        let mut dirty = false;
        for node_id in &merged {
            let node = state
                .nodes
                .remove(node_id)
                .ok_or_else(|| CoreError::inactive(*node_id))?;
            dirty |= node.dirty;
            if *node_id == leaf {
                document = Some(node.document);
            }
        }

        let target_node = state.node_mut(target)?;
        if let Some(document) = document {
            target_node.document = document;
        }
        target_node.dirty |= dirty;
        target_node.child = None;

        debug!(txn = %id, into = %target, levels = merged.len(), "committed");
        Ok(())
    }

    /// Discards everything from the current leaf up to and including `id`.
    pub(crate) fn rollback(&self, id: TransactionId) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_active(id)?;

        let discarded: Vec<TransactionId> = state
            .path_from_leaf(id)?
            .into_iter()
            .filter(|node| !node.is_root())
            .collect();
        if discarded.is_empty() {
            return Ok(());
        }

        let target = state.node(id)?.parent.unwrap_or(id);
        for node_id in &discarded {
            state.nodes.remove(node_id);
        }
        state.node_mut(target)?.child = None;

        debug!(txn = %id, levels = discarded.len(), "rolled back");
        Ok(())
    }

    /// Returns a deep copy of a transaction's snapshot.
    pub(crate) fn document(&self, id: TransactionId) -> CoreResult<Document> {
        let state = self.state.lock();
        state.ensure_active(id)?;
        Ok(state.node(id)?.document.clone())
    }

    /// Materializes a collection of `id`'s snapshot as shape `S`.
    pub(crate) fn read_records<S: DeserializeOwned>(
        &self,
        id: TransactionId,
        name: &str,
    ) -> CoreResult<Vec<S>> {
        let state = self.state.lock();
        state.ensure_active(id)?;
        state.node(id)?.document.records(name)
    }

    /// Writes a collection into `id`'s snapshot and marks it dirty.
    pub(crate) fn store_collection(
        &self,
        id: TransactionId,
        name: &str,
        records: Vec<Value>,
        element_type: &str,
    ) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_leaf(id)?;

        let node = state.node_mut(id)?;
        node.document.set_collection(name, records);
        node.document.register_collection(name, element_type);
        node.dirty = true;
        Ok(())
    }

    /// Snapshots the root for flushing and clears its dirty flag.
    ///
    /// Returns `None` when `only_if_dirty` is set and the root is clean.
    pub(crate) fn take_root_for_flush(&self, only_if_dirty: bool) -> Option<Document> {
        let mut state = self.state.lock();
        let root = state.nodes.get_mut(&TransactionId::ROOT)?;
        if only_if_dirty && !root.dirty {
            return None;
        }
        root.dirty = false;
        Some(root.document.clone())
    }

    /// Re-flags the root after a failed flush.
    pub(crate) fn mark_root_dirty(&self) {
        if let Some(root) = self.state.lock().nodes.get_mut(&TransactionId::ROOT) {
            root.dirty = true;
        }
    }

    /// Replaces the root snapshot with a freshly loaded document.
    pub(crate) fn replace_root(&self, document: Document) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_leaf(TransactionId::ROOT)?;

        let root = state.node_mut(TransactionId::ROOT)?;
        root.document = document;
        root.dirty = false;
        Ok(())
    }
}

impl ChainState {
    fn node(&self, id: TransactionId) -> CoreResult<&TransactionNode> {
        self.nodes.get(&id).ok_or_else(|| CoreError::inactive(id))
    }

    fn node_mut(&mut self, id: TransactionId) -> CoreResult<&mut TransactionNode> {
        self.nodes.get_mut(&id).ok_or_else(|| CoreError::inactive(id))
    }

    /// A transaction is active while its chain still ends at the store.
    fn is_active(&self, id: TransactionId) -> bool {
        let mut current = id;
        loop {
            match self.nodes.get(&current) {
                None => return false,
                Some(node) => match node.parent {
                    Some(parent) => current = parent,
                    None => return current.is_root(),
                },
            }
        }
    }

    fn ensure_active(&self, id: TransactionId) -> CoreResult<()> {
        if self.is_active(id) {
            Ok(())
        } else {
            Err(CoreError::inactive(id))
        }
    }

    fn ensure_leaf(&self, id: TransactionId) -> CoreResult<()> {
        self.ensure_active(id)?;
        let node = self.node(id)?;
        if node.is_leaf() {
            return Ok(());
        }
        Err(CoreError::invalid_state(format!(
            "{id} is not the leaf transaction; a nested transaction is open"
        )))
    }

    fn leaf_of(&self, id: TransactionId) -> CoreResult<TransactionId> {
        let mut current = id;
        while let Some(child) = self.node(current)?.child {
            current = child;
        }
        Ok(current)
    }

    /// Node ids from the current leaf up to `id`, leaf first.
    fn path_from_leaf(&self, id: TransactionId) -> CoreResult<Vec<TransactionId>> {
        let mut path = vec![self.leaf_of(id)?];
        while let Some(&current) = path.last() {
            if current == id {
                break;
            }
            let parent = self.node(current)?.parent.ok_or_else(|| {
                CoreError::invalid_state(format!("{current} is detached from {id}"))
            })?;
            path.push(parent);
        }
        Ok(path)
    }
}
