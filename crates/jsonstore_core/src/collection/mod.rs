//! Record collections.
//!
//! Provides `Collection<T>`, a typed or dynamic view over one named array of
//! a transaction's snapshot.

mod record;
mod typed;

pub(crate) use record::short_type_name;
pub use record::{DynamicRecord, Record};
pub use typed::Collection;
pub(crate) use typed::WriteMode;
