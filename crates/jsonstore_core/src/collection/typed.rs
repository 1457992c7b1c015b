//! Typed collection implementation.

use crate::collection::{short_type_name, Record};
use crate::error::CoreResult;
use crate::transaction::{auto_commit, Transaction};
use std::cell::OnceCell;
use std::fmt;

/// How a collection publishes its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Write straight into the owning transaction's snapshot.
    Direct,
    /// Wrap every write in its own nested transaction (store-level handles).
    AutoCommit,
}

/// A view over one named array of a transaction snapshot.
///
/// The records are materialized from the snapshot on first access and kept
/// by the handle; two handles over the same array do not share their lists.
/// Every write is applied to a copy of the list, published into the owning
/// transaction, and adopted by the handle only once publishing succeeded.
///
/// Querying uses plain closures:
///
/// ```rust
/// use jsonstore_core::{Config, Record, Store};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Task {
///     title: String,
///     done: bool,
/// }
///
/// impl Record for Task {}
///
/// let store = Store::create(Config::default()).unwrap();
/// let mut tasks = store.get_collection::<Task>().unwrap();
/// tasks.insert(Task { title: "write".into(), done: false }).unwrap();
/// tasks.update(|t| t.title == "write", |t| t.done = true).unwrap();
///
/// assert!(tasks.any(|t| t.done).unwrap());
/// ```
pub struct Collection<T: Record> {
    name: String,
    owner: Transaction,
    mode: WriteMode,
    records: OnceCell<Vec<T>>,
}

impl<T: Record> Collection<T> {
    pub(crate) fn new(name: &str, owner: Transaction, mode: WriteMode) -> Self {
        Self {
            name: name.to_string(),
            owner,
            mode,
            records: OnceCell::new(),
        }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transaction this view belongs to.
    #[must_use]
    pub fn owner(&self) -> &Transaction {
        &self.owner
    }

    /// Returns the records matching `predicate`, lazily.
    pub fn find<'a, P>(&'a self, mut predicate: P) -> CoreResult<impl Iterator<Item = &'a T> + 'a>
    where
        P: FnMut(&T) -> bool + 'a,
    {
        Ok(self.records()?.iter().filter(move |record| predicate(record)))
    }

    /// Returns the first record matching `predicate`.
    pub fn first<P>(&self, mut predicate: P) -> CoreResult<Option<&T>>
    where
        P: FnMut(&T) -> bool,
    {
        Ok(self.records()?.iter().find(|record| predicate(record)))
    }

    /// Returns true if any record matches `predicate`.
    pub fn any<P>(&self, predicate: P) -> CoreResult<bool>
    where
        P: FnMut(&T) -> bool,
    {
        Ok(self.records()?.iter().any(predicate))
    }

    /// Returns the number of records.
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.records()?.len())
    }

    /// Returns all records.
    pub fn as_list(&self) -> CoreResult<&[T]> {
        Ok(self.records()?.as_slice())
    }

    /// Returns an owned copy of all records.
    pub fn to_vec(&self) -> CoreResult<Vec<T>> {
        Ok(self.records()?.clone())
    }

    /// Appends a record. Returns 1.
    pub fn insert(&mut self, record: T) -> CoreResult<usize> {
        self.apply(|records| {
            records.push(record);
            Some(1)
        })
    }

    /// Appends several records. Returns how many were added.
    pub fn insert_many<I>(&mut self, records: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let added: Vec<T> = records.into_iter().collect();
        let count = added.len();
        self.apply(|records| {
            records.extend(added);
            Some(count)
        })
    }

    /// Mutates every record matching `predicate` in place.
    ///
    /// Returns the number of records matched. Nothing is published when no
    /// record matches.
    pub fn update<P, U>(&mut self, mut predicate: P, mut transform: U) -> CoreResult<usize>
    where
        P: FnMut(&T) -> bool,
        U: FnMut(&mut T),
    {
        self.apply(|records| {
            let mut matched = 0;
            for record in records.iter_mut().filter(|record| predicate(record)) {
                transform(record);
                matched += 1;
            }
            (matched > 0).then_some(matched)
        })
    }

    /// Removes every record matching `predicate`. Returns how many were removed.
    pub fn delete<P>(&mut self, mut predicate: P) -> CoreResult<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.apply(|records| {
            let before = records.len();
            records.retain(|record| !predicate(record));
            let removed = before - records.len();
            (removed > 0).then_some(removed)
        })
    }

    /// Updates the matching records, or inserts `value` if none match.
    ///
    /// Returns the number of records updated, or 1 for an insert.
    pub fn upsert<P, U>(&mut self, mut predicate: P, mut transform: U, value: T) -> CoreResult<usize>
    where
        P: FnMut(&T) -> bool,
        U: FnMut(&mut T),
    {
        self.apply(|records| {
            let mut matched = 0;
            for record in records.iter_mut().filter(|record| predicate(record)) {
                transform(record);
                matched += 1;
            }
            if matched == 0 {
                records.push(value);
                matched = 1;
            }
            Some(matched)
        })
    }

    /// Edits the whole list at once and publishes the result.
    pub fn modify<F, R>(&mut self, edit: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let mut working = self.records()?.clone();
        let result = edit(&mut working);

        self.publish(&working)?;
        self.records = OnceCell::from(working);
        Ok(result)
    }

    fn records(&self) -> CoreResult<&Vec<T>> {
        self.owner.ensure_active()?;
        if let Some(records) = self.records.get() {
            return Ok(records);
        }
        let loaded = self.owner.read_records::<T>(&self.name)?;
        Ok(self.records.get_or_init(|| loaded))
    }

    /// Runs `edit` on a working copy and publishes it if the edit reports a
    /// change. The handle keeps its old list unless publishing succeeded.
    fn apply<F>(&mut self, edit: F) -> CoreResult<usize>
    where
        F: FnOnce(&mut Vec<T>) -> Option<usize>,
    {
        let mut working = self.records()?.clone();
        let Some(count) = edit(&mut working) else {
            return Ok(0);
        };

        self.publish(&working)?;
        self.records = OnceCell::from(working);
        Ok(count)
    }

    fn publish(&self, records: &[T]) -> CoreResult<()> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let element_type = short_type_name(std::any::type_name::<T>());

        match self.mode {
            WriteMode::Direct => self.owner.store_collection(&self.name, values, element_type),
            WriteMode::AutoCommit => auto_commit(&self.owner, |txn| {
                txn.store_collection(&self.name, values, element_type)
            }),
        }
    }
}

impl<T: Record> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("owner", &self.owner.id())
            .field("mode", &self.mode)
            .field("loaded", &self.records.get().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::CoreError;
    use crate::transaction::TransactionChain;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        label: String,
    }

    impl Record for Item {}

    fn item(id: i64, label: &str) -> Item {
        Item {
            id,
            label: label.to_string(),
        }
    }

    fn root() -> Transaction {
        Transaction::new_root(Arc::new(TransactionChain::new(Document::new())))
    }

    #[test]
    fn default_name_is_type_name() {
        let items = root().get_collection::<Item>().unwrap();
        assert_eq!(items.name(), "Item");
    }

    #[test]
    fn insert_and_find() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();

        assert_eq!(items.insert(item(1, "a")).unwrap(), 1);
        assert_eq!(items.insert_many(vec![item(2, "b"), item(3, "b")]).unwrap(), 2);

        let found: Vec<i64> = items.find(|i| i.label == "b").unwrap().map(|i| i.id).collect();
        assert_eq!(found, vec![2, 3]);
        assert_eq!(items.first(|i| i.id == 1).unwrap(), Some(&item(1, "a")));
        assert_eq!(items.count().unwrap(), 3);
        assert!(root.is_dirty());
    }

    #[test]
    fn writes_reach_snapshot() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        items.insert(item(1, "a")).unwrap();

        let fresh = root.get_collection::<Item>().unwrap();
        assert_eq!(fresh.to_vec().unwrap(), vec![item(1, "a")]);
        assert_eq!(root.document().unwrap().collection("Item").unwrap().len(), 1);
    }

    #[test]
    fn handles_do_not_share_lists() {
        let root = root();
        let stale = root.get_collection::<Item>().unwrap();
        assert_eq!(stale.count().unwrap(), 0);

        let mut writer = root.get_collection::<Item>().unwrap();
        writer.insert(item(1, "a")).unwrap();

        assert_eq!(stale.count().unwrap(), 0);
        assert_eq!(writer.count().unwrap(), 1);
    }

    #[test]
    fn update_in_place() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        items.insert_many(vec![item(1, "a"), item(2, "b")]).unwrap();

        let matched = items.update(|i| i.id == 2, |i| i.label = "z".into()).unwrap();
        assert_eq!(matched, 1);
        assert_eq!(items.first(|i| i.id == 2).unwrap().unwrap().label, "z");
    }

    #[test]
    fn update_without_match_does_not_publish() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();

        assert_eq!(items.update(|_| true, |i| i.id = 0).unwrap(), 0);
        assert!(!root.is_dirty());
        assert_eq!(items.delete(|_| true).unwrap(), 0);
        assert!(!root.is_dirty());
    }

    #[test]
    fn delete_matching() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        items.insert_many((1..=5).map(|id| item(id, "x"))).unwrap();

        assert_eq!(items.delete(|i| i.id % 2 == 0).unwrap(), 2);
        assert_eq!(items.count().unwrap(), 3);
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();

        items.upsert(|i| i.id == 1, |i| i.label = "new".into(), item(1, "first")).unwrap();
        assert_eq!(items.to_vec().unwrap(), vec![item(1, "first")]);

        items.upsert(|i| i.id == 1, |i| i.label = "new".into(), item(1, "first")).unwrap();
        assert_eq!(items.to_vec().unwrap(), vec![item(1, "new")]);
    }

    #[test]
    fn modify_whole_list() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        items.insert_many(vec![item(2, "b"), item(1, "a")]).unwrap();

        let len = items.modify(|list| {
            list.sort_by_key(|i| i.id);
            list.len()
        });
        assert_eq!(len.unwrap(), 2);

        let fresh = root.get_collection::<Item>().unwrap();
        assert_eq!(fresh.as_list().unwrap()[0].id, 1);
    }

    #[test]
    fn typed_and_dynamic_views_share_array() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        items.insert(item(7, "seven")).unwrap();

        let dynamic = root.get_dynamic_collection("Item").unwrap();
        let row = dynamic.first(|_| true).unwrap().unwrap();
        assert_eq!(row["id"], 7);
        assert_eq!(row["label"], "seven");
    }

    #[test]
    fn catalogue_records_unqualified_element_type() {
        let root = root();
        root.get_collection::<Item>().unwrap().insert(item(1, "a")).unwrap();
        let mut tags = root.get_dynamic_collection("tags").unwrap();
        tags.insert(serde_json::Map::new()).unwrap();

        let types: Vec<(String, String)> = root
            .collections()
            .unwrap()
            .into_iter()
            .map(|info| (info.name, info.element_type))
            .collect();
        assert_eq!(
            types,
            vec![
                ("Item".to_string(), "Item".to_string()),
                ("tags".to_string(), "Map".to_string()),
            ]
        );
    }

    #[test]
    fn inactive_owner_rejects_everything() {
        let root = root();
        let txn = root.begin_transaction().unwrap();
        let mut items = txn.get_collection::<Item>().unwrap();
        txn.rollback().unwrap();

        assert!(matches!(items.count(), Err(CoreError::InactiveTransaction { .. })));
        assert!(matches!(
            items.insert(item(1, "a")),
            Err(CoreError::InactiveTransaction { .. })
        ));
    }

    #[test]
    fn owner_must_stay_leaf_for_writes() {
        let root = root();
        let mut items = root.get_collection::<Item>().unwrap();
        let _nested = root.begin_transaction().unwrap();

        let result = items.insert(item(1, "a"));
        assert!(matches!(result, Err(CoreError::InvalidState { .. })));
        assert_eq!(items.count().unwrap(), 0);
    }

    #[test]
    fn auto_commit_handle_keeps_list_on_violation() {
        let root = root();
        root.add_unique("Item", "id").unwrap();
        let mut items: Collection<Item> = root
            .collection_with_mode("Item", WriteMode::AutoCommit)
            .unwrap();

        items.insert(item(1, "a")).unwrap();
        let err = items.insert(item(1, "dup")).unwrap_err();

        assert!(err.as_constraint_violation().is_some());
        assert_eq!(items.count().unwrap(), 1);
        assert!(root.is_leaf());
    }
}
