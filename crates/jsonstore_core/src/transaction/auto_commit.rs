//! One-shot transactions around unguarded calls.

use crate::error::CoreResult;
use crate::transaction::Transaction;
use tracing::{debug, warn};

/// Runs `action` in its own nested transaction under `from`.
///
/// The nested transaction is committed when `action` succeeds. If `action`
/// fails, or the commit is rejected by a constraint, the nested transaction
/// is rolled back and the error is returned, so the caller observes no
/// partial change.
///
/// # Example
///
/// ```rust
/// use jsonstore_core::{auto_commit, Config, Store};
///
/// let store = Store::create(Config::default()).unwrap();
/// let root = store.root();
///
/// let id = auto_commit(&root, |txn| txn.next("Order")).unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(store.level(), 0);
/// ```
pub fn auto_commit<R, F>(from: &Transaction, action: F) -> CoreResult<R>
where
    F: FnOnce(&Transaction) -> CoreResult<R>,
{
    let txn = from.begin_transaction()?;

    let result = action(&txn).and_then(|value| txn.commit().map(|()| value));
    if let Err(err) = &result {
        if txn.is_active() {
            debug!(txn = %txn.id(), error = %err, "auto-commit rolled back");
            // The action's error is returned either way.
            if let Err(rollback_err) = txn.rollback() {
                warn!(
                    txn = %txn.id(),
                    error = %rollback_err,
                    "auto-commit rollback failed"
                );
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::CoreError;
    use crate::transaction::TransactionChain;
    use crate::DynamicRecord;
    use serde_json::json;
    use std::sync::Arc;

    fn root() -> Transaction {
        Transaction::new_root(Arc::new(TransactionChain::new(Document::new())))
    }

    fn row(value: serde_json::Value) -> DynamicRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn commits_on_success() {
        let root = root();

        auto_commit(&root, |txn| {
            let mut users = txn.get_dynamic_collection("users")?;
            users.insert(row(json!({"name": "a"})))
        })
        .unwrap();

        assert_eq!(root.get_dynamic_collection("users").unwrap().count().unwrap(), 1);
        assert!(root.is_leaf());
        assert!(root.is_dirty());
    }

    #[test]
    fn rolls_back_on_action_error() {
        let root = root();

        let result: CoreResult<()> = auto_commit(&root, |txn| {
            let mut users = txn.get_dynamic_collection("users")?;
            users.insert(row(json!({"name": "a"})))?;
            Err(CoreError::invalid_state("boom"))
        });

        assert!(result.is_err());
        assert!(root.is_leaf());
        assert_eq!(root.get_dynamic_collection("users").unwrap().count().unwrap(), 0);
    }

    #[test]
    fn action_error_survives_inner_rollback() {
        let root = root();

        let result: CoreResult<()> = auto_commit(&root, |txn| {
            txn.rollback()?;
            Err(CoreError::invalid_state("gave up"))
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("gave up"));
        assert!(root.is_leaf());
        assert!(!root.is_dirty());
    }

    #[test]
    fn rolls_back_on_violation() {
        let root = root();
        root.add_required("users", "name").unwrap();

        let result = auto_commit(&root, |txn| {
            let mut users = txn.get_dynamic_collection("users")?;
            users.insert(row(json!({"age": 3})))
        });

        assert!(result.unwrap_err().as_constraint_violation().is_some());
        assert!(root.is_leaf());
        assert_eq!(root.get_dynamic_collection("users").unwrap().count().unwrap(), 0);
    }

    #[test]
    fn explicit_commit_keeps_chain_open_on_violation() {
        let root = root();
        root.add_required("users", "name").unwrap();

        let txn = root.begin_transaction().unwrap();
        let mut users = txn.get_dynamic_collection("users").unwrap();
        users.insert(row(json!({"age": 3}))).unwrap();

        let err = txn.commit().unwrap_err();
        assert!(err.as_constraint_violation().is_some());

        // Unlike auto-commit, the failed transaction stays open.
        assert!(txn.is_active());
        assert_eq!(root.child(), Some(txn.clone()));
        assert_eq!(users.count().unwrap(), 1);

        txn.rollback().unwrap();
        assert!(root.is_leaf());
    }
}
