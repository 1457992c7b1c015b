//! Constraint enforcement through explicit and automatic transactions.

use jsonstore_core::{ConstraintKind, CoreError, DynamicRecord};
use jsonstore_testkit::prelude::*;
use serde_json::json;

fn kind_of(err: CoreError) -> ConstraintKind {
    err.as_constraint_violation()
        .map(|v| v.kind)
        .unwrap_or_else(|| panic!("expected a constraint violation, got {err}"))
}

#[test]
fn required_violation_leaves_root_unchanged() {
    init_test_logging();
    let store = TestStore::memory();
    user_constraints(&store);
    store.get_collection::<User>().unwrap().insert(User::new(1, "a")).unwrap();
    let before = store.document().unwrap();

    let txn = store.begin_transaction().unwrap();
    txn.get_collection::<User>().unwrap().insert(User::anonymous(2)).unwrap();

    assert_eq!(kind_of(txn.commit().unwrap_err()), ConstraintKind::Required);
    assert_eq!(store.document().unwrap(), before);
}

#[test]
fn unique_violation_leaves_root_unchanged() {
    let store = TestStore::memory();
    user_constraints(&store);
    let before = store.document().unwrap();

    let txn = store.begin_transaction().unwrap();
    txn.get_collection::<User>()
        .unwrap()
        .insert_many(vec![User::new(1, "a"), User::new(1, "b")])
        .unwrap();

    assert_eq!(kind_of(txn.commit().unwrap_err()), ConstraintKind::Unique);
    assert_eq!(store.document().unwrap(), before);
}

#[test]
fn reference_violation_leaves_root_unchanged() {
    let store = TestStore::memory();
    user_constraints(&store);
    store.get_collection::<User>().unwrap().insert(User::new(1, "a")).unwrap();
    let before = store.document().unwrap();

    let txn = store.begin_transaction().unwrap();
    txn.get_collection::<Order>()
        .unwrap()
        .insert(Order::new(1, 99, 10.0))
        .unwrap();

    let err = txn.commit().unwrap_err();
    let violation = err.as_constraint_violation().unwrap();
    assert_eq!(violation.kind, ConstraintKind::Reference);
    assert_eq!(violation.collection, "Order");
    assert_eq!(violation.reference_collection.as_deref(), Some("User"));
    assert_eq!(store.document().unwrap(), before);
}

#[test]
fn valid_references_commit() {
    let store = TestStore::memory();
    user_constraints(&store);

    let txn = store.begin_transaction().unwrap();
    txn.get_collection::<Department>()
        .unwrap()
        .insert(Department::new(10, "ops"))
        .unwrap();
    txn.get_collection::<User>()
        .unwrap()
        .insert(User::new(1, "a").in_department(10))
        .unwrap();
    txn.get_collection::<Order>()
        .unwrap()
        .insert(Order::new(1, 1, 5.0))
        .unwrap();
    txn.commit().unwrap();

    assert_eq!(store.get_collection::<Order>().unwrap().count().unwrap(), 1);
}

#[test]
fn explicit_commit_failure_does_not_roll_back() {
    let store = TestStore::memory();
    user_constraints(&store);

    let outer = store.begin_transaction().unwrap();
    let inner = outer.begin_transaction().unwrap();
    inner.get_collection::<User>().unwrap().insert(User::anonymous(1)).unwrap();

    assert!(outer.commit().is_err());

    // The failing chain is still open and linked; discarding it is up to the caller.
    assert!(outer.is_active());
    assert!(inner.is_active());
    assert_eq!(store.level(), 2);
    assert_eq!(inner.get_collection::<User>().unwrap().count().unwrap(), 1);

    outer.rollback().unwrap();
    assert_eq!(store.level(), 0);
    assert_eq!(store.get_collection::<User>().unwrap().count().unwrap(), 0);
}

#[test]
fn auto_commit_failure_rolls_back() {
    let store = TestStore::memory();
    user_constraints(&store);
    let mut users = store.get_collection::<User>().unwrap();
    users.insert(User::new(1, "a")).unwrap();

    let err = users.insert(User::anonymous(2)).unwrap_err();

    assert_eq!(kind_of(err), ConstraintKind::Required);
    assert_eq!(store.level(), 0);
    assert_eq!(users.count().unwrap(), 1);
    assert_eq!(store.get_collection::<User>().unwrap().count().unwrap(), 1);
}

#[test]
fn constraints_added_in_transaction_apply_on_its_commit() {
    let store = TestStore::memory();
    store
        .get_collection::<User>()
        .unwrap()
        .insert_many(vec![User::new(1, "a"), User::new(1, "b")])
        .unwrap();

    let txn = store.begin_transaction().unwrap();
    txn.add_unique("User", "id").unwrap();
    assert_eq!(kind_of(txn.commit().unwrap_err()), ConstraintKind::Unique);
    txn.rollback().unwrap();

    assert!(store.constraints().unwrap().is_empty());
}

#[test]
fn adding_again_replaces_constraint() {
    let store = TestStore::memory();
    store.add_required("User", "name").unwrap();
    store.add_unique("User", "name").unwrap();

    let constraints = store.constraints().unwrap();
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].kind, ConstraintKind::Unique);

    // Two anonymous users no longer break REQUIRED but share a null name.
    let mut users = store.get_collection::<User>().unwrap();
    users.insert(User::anonymous(1)).unwrap();
    assert_eq!(kind_of(users.insert(User::anonymous(2)).unwrap_err()), ConstraintKind::Unique);
}

#[test]
fn dropped_constraint_is_no_longer_enforced() {
    let store = TestStore::memory();
    store.add_required("User", "name").unwrap();
    assert_eq!(store.drop_constraints("User", "name").unwrap(), 1);

    let mut users = store.get_collection::<User>().unwrap();
    users.insert(User::anonymous(1)).unwrap();
    assert_eq!(users.count().unwrap(), 1);
}

#[test]
fn dynamic_view_is_checked_like_typed() {
    let store = TestStore::memory();
    store.add_required("User", "name").unwrap();
    let mut rows = store.get_dynamic_collection("User").unwrap();

    let row: DynamicRecord = json!({"id": 1}).as_object().cloned().unwrap();
    assert_eq!(kind_of(rows.insert(row).unwrap_err()), ConstraintKind::Required);
    assert_eq!(rows.count().unwrap(), 0);
}

#[test]
fn violation_messages_name_the_rule() {
    let store = TestStore::memory();
    store.add_reference("Order", "user_id", "User", "id").unwrap();

    let err = store
        .get_collection::<Order>()
        .unwrap()
        .insert(Order::new(1, 7, 1.0))
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "constraint violation: REFERENCE on Order.user_id -> User.id"
    );
}
