//! # jsonstore core
//!
//! An embedded, schema-light document store. A single JSON object is the
//! database; its top-level arrays are collections of records.
//!
//! This crate provides:
//! - The [`Document`] model and its reserved metadata collections
//! - A chain of nested [`Transaction`]s, each owning an isolated snapshot
//! - Typed and dynamic [`Collection`] views over the same array
//! - REQUIRED / UNIQUE / REFERENCE constraints checked at commit time
//! - Per-name sequences
//! - The [`Store`] facade with auto-commit for unguarded calls and optional autosave
//!
//! ## Example
//!
//! ```rust
//! use jsonstore_core::{Config, Record, Store};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Record for User {}
//!
//! let store = Store::create(Config::default()).unwrap();
//! store.add_unique("User", "id").unwrap();
//!
//! let txn = store.begin_transaction().unwrap();
//! let mut users = txn.get_collection::<User>().unwrap();
//! users.insert(User { id: 1, name: "Alice".into() }).unwrap();
//! txn.commit().unwrap();
//!
//! assert_eq!(store.get_collection::<User>().unwrap().count().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod autosave;
mod collection;
mod config;
mod constraint;
mod document;
mod error;
mod sequence;
mod store;
mod transaction;
mod types;

pub use collection::{Collection, DynamicRecord, Record};
pub use config::Config;
pub use constraint::{Constraint, ConstraintKind, ConstraintViolation};
pub use document::{is_reserved, CollectionInfo, Document, COLLECTIONS, CONSTRAINTS, SEQUENCES};
pub use error::{CoreError, CoreResult};
pub use sequence::Sequence;
pub use store::Store;
pub use transaction::{auto_commit, Transaction};
pub use types::TransactionId;

pub use jsonstore_storage::{
    EncryptedBackend, FileBackend, InMemoryBackend, StorageBackend, StorageError,
};
