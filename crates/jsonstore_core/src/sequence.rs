//! Per-name counters in the `_sequences` collection.

use crate::collection::Record;
use crate::document::SEQUENCES;
use crate::error::CoreResult;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Logical entity name.
    pub name: String,
    /// Last value handed out.
    pub value: i64,
}

impl Record for Sequence {
    fn collection_name() -> &'static str {
        SEQUENCES
    }
}

/// Increments the named counter in `txn`'s snapshot, creating it at 1.
pub(crate) fn next(txn: &Transaction, name: &str) -> CoreResult<i64> {
    let mut sequences = txn.get_collection::<Sequence>()?;
    sequences.upsert(
        |row| row.name == name,
        |row| row.value += 1,
        Sequence {
            name: name.to_string(),
            value: 1,
        },
    )?;

    let value = sequences
        .first(|row| row.name == name)?
        .map_or(1, |row| row.value);
    trace!(txn = %txn.id(), sequence = name, value, "allocated");
    Ok(value)
}
