//! Test fixtures and store helpers.
//!
//! Provides stores over memory or a temporary file and a small relational
//! schema (users, departments, orders) to exercise constraints with.

use jsonstore_core::{Config, Record, Store};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory test store with a custom configuration.
    pub fn memory_with(config: Config) -> Self {
        Self {
            store: Store::create(config).expect("Failed to create in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test store.
    pub fn file() -> Self {
        Self::file_with(Config::default())
    }

    /// Creates a file-based test store with a custom configuration.
    pub fn file_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(STORE_FILE);
        let store = Store::create_path(&path, config).expect("Failed to create file store");

        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store file if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join(STORE_FILE))
    }

    /// Closes the store and opens the same file again.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self, config: Config) -> Self {
        let Self { store, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file stores can be reopened");
        drop(store);

        let store = Store::open_path(&temp_dir.path().join(STORE_FILE), config)
            .expect("Failed to reopen file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }
}

const STORE_FILE: &str = "store.json";

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test with a store in a temporary file.
///
/// The closure also receives the file path so it can inspect the bytes.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &Path) -> R,
{
    let store = TestStore::file();
    let path = store.path().expect("File store has a path");
    f(&store, &path)
}

/// Sample user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Display name; `None` violates [`user_constraints`]' `REQUIRED` rule.
    pub name: Option<String>,
    /// Department the user belongs to.
    #[serde(default)]
    pub department_id: Option<i64>,
}

impl User {
    /// Creates a user with a name and no department.
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            department_id: None,
        }
    }

    /// Creates a user without a name.
    pub fn anonymous(id: i64) -> Self {
        Self {
            id,
            name: None,
            department_id: None,
        }
    }

    /// Assigns the user to a department.
    #[must_use]
    pub fn in_department(mut self, department_id: i64) -> Self {
        self.department_id = Some(department_id);
        self
    }
}

impl Record for User {}

/// Sample department record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Unique identifier.
    pub id: i64,
    /// Department name.
    pub name: String,
}

impl Department {
    /// Creates a department.
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Record for Department {}

/// Sample order record referencing a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Order total.
    pub total: f64,
}

impl Order {
    /// Creates an order.
    pub fn new(id: i64, user_id: i64, total: f64) -> Self {
        Self { id, user_id, total }
    }
}

impl Record for Order {}

/// Registers the sample schema's constraints on `store`:
/// users need a name and a unique id, departments a unique id, users and
/// orders must reference existing departments and users.
pub fn user_constraints(store: &Store) {
    store.add_required("User", "name").expect("Failed to add constraint");
    store.add_unique("User", "id").expect("Failed to add constraint");
    store.add_unique("Department", "id").expect("Failed to add constraint");
    store
        .add_reference("User", "department_id", "Department", "id")
        .expect("Failed to add constraint");
    store
        .add_reference("Order", "user_id", "User", "id")
        .expect("Failed to add constraint");
}
