//! Constraint registry over the `_constraints` collection.

use crate::constraint::Constraint;
use crate::document::CONSTRAINTS;
use crate::error::CoreResult;
use crate::transaction::Transaction;
use tracing::debug;

/// Registers `constraint`, replacing any constraint on the same attribute.
pub(crate) fn add(txn: &Transaction, constraint: Constraint) -> CoreResult<()> {
    debug!(
        txn = %txn.id(),
        kind = %constraint.kind,
        collection = %constraint.collection_name,
        attribute = %constraint.attribute_name,
        "registering constraint"
    );

    let mut constraints = txn.get_collection::<Constraint>()?;
    let collection = constraint.collection_name.clone();
    let attribute = constraint.attribute_name.clone();
    let replacement = constraint.clone();
    constraints.upsert(
        |existing| existing.targets(&collection, &attribute),
        |existing| *existing = replacement.clone(),
        constraint,
    )?;
    Ok(())
}

/// Removes the constraints on `collection.attribute`.
pub(crate) fn drop(txn: &Transaction, collection: &str, attribute: &str) -> CoreResult<usize> {
    let mut constraints = txn.get_collection::<Constraint>()?;
    constraints.delete(|existing| existing.targets(collection, attribute))
}

/// Lists the constraints visible in `txn`'s snapshot.
pub(crate) fn list(txn: &Transaction) -> CoreResult<Vec<Constraint>> {
    txn.ensure_active()?;
    txn.read_records(CONSTRAINTS)
}
