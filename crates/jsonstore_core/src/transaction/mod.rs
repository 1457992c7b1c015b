//! Nested transactions.
//!
//! Transactions form a chain rooted at the store. Each node owns a deep copy
//! of the document taken when it was opened:
//! - **Isolation**: a nested transaction works on its own snapshot
//! - **Commit**: validates the leaf's snapshot, then moves it up the chain
//! - **Rollback**: detaches the nested nodes and drops their snapshots
//! - **Auto-commit**: unguarded calls run in a one-shot nested transaction

mod auto_commit;
mod handle;
mod manager;
mod state;

pub use auto_commit::auto_commit;
pub use handle::Transaction;
pub(crate) use manager::TransactionChain;
