//! Public transaction handle.

use crate::collection::{Collection, DynamicRecord, Record, WriteMode};
use crate::constraint::{registry, Constraint};
use crate::document::{CollectionInfo, Document};
use crate::error::CoreResult;
use crate::sequence;
use crate::transaction::TransactionChain;
use crate::types::TransactionId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A handle to one node of a store's transaction chain.
///
/// Handles are cheap to clone and all clones refer to the same node. Once
/// the node is committed or rolled back, by itself or through an ancestor,
/// every clone becomes inactive and operations on it fail with
/// [`CoreError::InactiveTransaction`](crate::CoreError::InactiveTransaction).
///
/// Only the leaf of the chain can hand out collections or be written to.
///
/// # Example
///
/// ```rust
/// use jsonstore_core::{Config, Store};
///
/// let store = Store::create(Config::default()).unwrap();
/// let outer = store.begin_transaction().unwrap();
/// let inner = outer.begin_transaction().unwrap();
/// assert_eq!(inner.level().unwrap(), 2);
///
/// inner.rollback().unwrap();
/// assert!(!inner.is_active());
/// assert_eq!(store.level(), 1);
/// outer.commit().unwrap();
/// ```
#[derive(Clone)]
pub struct Transaction {
    id: TransactionId,
    chain: Arc<TransactionChain>,
}

impl Transaction {
    pub(crate) fn new_root(chain: Arc<TransactionChain>) -> Self {
        Self {
            id: TransactionId::ROOT,
            chain,
        }
    }

    fn sibling(&self, id: TransactionId) -> Self {
        Self {
            id,
            chain: Arc::clone(&self.chain),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the distance to the root; the store itself is level 0.
    pub fn level(&self) -> CoreResult<usize> {
        self.chain.level(self.id)
    }

    /// Returns true if no transaction is nested under this one.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.chain.is_leaf(self.id)
    }

    /// Returns true while this transaction is still linked to the store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.chain.is_active(self.id)
    }

    /// Returns true if this transaction's snapshot holds unflushed writes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.chain.is_dirty(self.id)
    }

    /// Returns the transaction this one was opened from.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.chain.parent(self.id).map(|id| self.sibling(id))
    }

    /// Returns the transaction nested directly under this one.
    #[must_use]
    pub fn child(&self) -> Option<Self> {
        self.chain.child(self.id).map(|id| self.sibling(id))
    }

    /// Returns the end of the chain below this transaction.
    pub fn leaf(&self) -> CoreResult<Self> {
        Ok(self.sibling(self.chain.leaf(self.id)?))
    }

    /// Returns the store's root transaction.
    #[must_use]
    pub fn root(&self) -> Self {
        self.sibling(TransactionId::ROOT)
    }

    /// Opens a nested transaction over a copy of this one's snapshot.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` if a nested transaction is already open.
    pub fn begin_transaction(&self) -> CoreResult<Self> {
        Ok(self.sibling(self.chain.begin(self.id)?))
    }

    /// Validates and merges every level from the leaf up to this one.
    ///
    /// On a constraint violation nothing is merged and the whole subtree
    /// stays open; call [`rollback`](Self::rollback) to discard it.
    /// Committing the root collapses the chain into the store but does not
    /// write it out; use [`Store::commit`](crate::Store::commit) for that.
    pub fn commit(&self) -> CoreResult<()> {
        self.chain.commit(self.id)
    }

    /// Discards every level from the leaf up to this one.
    pub fn rollback(&self) -> CoreResult<()> {
        self.chain.rollback(self.id)
    }

    /// Returns a copy of this transaction's snapshot.
    pub fn document(&self) -> CoreResult<Document> {
        self.chain.document(self.id)
    }

    /// Returns the default-named collection for `T`.
    pub fn get_collection<T: Record>(&self) -> CoreResult<Collection<T>> {
        self.get_collection_named(T::collection_name())
    }

    /// Returns a typed view over the named collection.
    pub fn get_collection_named<T: Record>(&self, name: &str) -> CoreResult<Collection<T>> {
        self.collection_with_mode(name, WriteMode::Direct)
    }

    /// Returns a schema-less view over the named collection.
    pub fn get_dynamic_collection(&self, name: &str) -> CoreResult<Collection<DynamicRecord>> {
        self.get_collection_named(name)
    }

    pub(crate) fn collection_with_mode<T: Record>(
        &self,
        name: &str,
        mode: WriteMode,
    ) -> CoreResult<Collection<T>> {
        self.chain.ensure_leaf(self.id)?;
        Ok(Collection::new(name, self.clone(), mode))
    }

    /// Lists the user collections known to this snapshot.
    pub fn collections(&self) -> CoreResult<Vec<CollectionInfo>> {
        self.document()?.collections()
    }

    /// Allocates the next value of the named sequence in this snapshot.
    pub fn next(&self, name: &str) -> CoreResult<i64> {
        sequence::next(self, name)
    }

    /// Allocates the next value of `T`'s sequence.
    pub fn next_for<T: Record>(&self) -> CoreResult<i64> {
        self.next(T::collection_name())
    }

    /// Requires `attribute` to be present and non-null in every record.
    pub fn add_required(&self, collection: &str, attribute: &str) -> CoreResult<()> {
        registry::add(self, Constraint::required(collection, attribute))
    }

    /// Requires `attribute` to be distinct across all records.
    pub fn add_unique(&self, collection: &str, attribute: &str) -> CoreResult<()> {
        registry::add(self, Constraint::unique(collection, attribute))
    }

    /// Requires every `attribute` value to exist as `reference_attribute`
    /// in `reference_collection`.
    pub fn add_reference(
        &self,
        collection: &str,
        attribute: &str,
        reference_collection: &str,
        reference_attribute: &str,
    ) -> CoreResult<()> {
        registry::add(
            self,
            Constraint::reference(collection, attribute, reference_collection, reference_attribute),
        )
    }

    /// Removes the constraint on `collection.attribute`; returns how many were removed.
    pub fn drop_constraints(&self, collection: &str, attribute: &str) -> CoreResult<usize> {
        registry::drop(self, collection, attribute)
    }

    /// Lists the registered constraints.
    pub fn constraints(&self) -> CoreResult<Vec<Constraint>> {
        registry::list(self)
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        self.chain.ensure_active(self.id)
    }

    pub(crate) fn read_records<S: DeserializeOwned>(&self, name: &str) -> CoreResult<Vec<S>> {
        self.chain.read_records(self.id, name)
    }

    pub(crate) fn store_collection(
        &self,
        name: &str,
        records: Vec<Value>,
        element_type: &str,
    ) -> CoreResult<()> {
        self.chain
            .store_collection(self.id, name, records, element_type)
    }

    pub(crate) fn chain(&self) -> &Arc<TransactionChain> {
        &self.chain
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.chain, &other.chain)
    }
}

impl Eq for Transaction {}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
