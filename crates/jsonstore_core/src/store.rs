//! Store facade.

use crate::autosave::AutoSaver;
use crate::collection::{Collection, DynamicRecord, Record, WriteMode};
use crate::config::Config;
use crate::constraint::Constraint;
use crate::document::{CollectionInfo, Document};
use crate::error::CoreResult;
use crate::transaction::{auto_commit, Transaction, TransactionChain};
use jsonstore_storage::{EncryptedBackend, FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

type SharedStorage = Arc<Mutex<Box<dyn StorageBackend>>>;

/// The main store handle.
///
/// A `Store` is the root of its transaction chain and owns the link to the
/// persistence backend. Calls made directly on the store act on the
/// current leaf of the chain and are each wrapped in their own nested
/// transaction, so a failing call leaves no partial change behind.
///
/// # Opening a Store
///
/// ```rust
/// use jsonstore_core::{Config, Store};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("data.json");
///
/// let store = Store::create_path(&path, Config::default()).unwrap();
/// assert_eq!(store.next("Invoice").unwrap(), 1);
/// store.save().unwrap();
/// drop(store);
///
/// let store = Store::open_path(&path, Config::default()).unwrap();
/// assert_eq!(store.next("Invoice").unwrap(), 2);
/// ```
///
/// # Encryption
///
/// With [`Config::password`] set, the stored stream is encrypted with a key
/// derived from the password. Opening it without the right password fails.
pub struct Store {
    root: Transaction,
    storage: SharedStorage,
    config: Config,
    autosave: Option<AutoSaver>,
}

impl Store {
    /// Creates an empty in-memory store.
    pub fn create(config: Config) -> CoreResult<Self> {
        Self::open(InMemoryBackend::new(), config)
    }

    /// Creates an in-memory store holding `document`.
    pub fn create_with(document: Document, config: Config) -> CoreResult<Self> {
        let store = Self::create(config)?;
        store.root.chain().replace_root(document)?;
        store.save()?;
        Ok(store)
    }

    /// Creates a store at `path`, replacing any existing file.
    pub fn create_path(path: &Path, config: Config) -> CoreResult<Self> {
        Self::open(FileBackend::create(path)?, config)
    }

    /// Opens the existing store at `path`.
    ///
    /// # Errors
    ///
    /// Fails with `StorageError::NotFound` if the file does not exist and
    /// with `StorageError::Locked` if another store holds it.
    pub fn open_path(path: &Path, config: Config) -> CoreResult<Self> {
        Self::open(FileBackend::open_existing(path)?, config)
    }

    /// Opens a store over any backend.
    ///
    /// An empty stream starts an empty document, which is written out
    /// immediately.
    pub fn open<B>(backend: B, config: Config) -> CoreResult<Self>
    where
        B: StorageBackend + 'static,
    {
        let mut storage: Box<dyn StorageBackend> = match config.password.as_deref() {
            Some(password) => Box::new(EncryptedBackend::new(Box::new(backend), password)),
            None => Box::new(backend),
        };

        let bytes = storage.read_all()?;
        let document = Document::from_bytes(&bytes)?;
        if bytes.is_empty() {
            storage.write_all(&document.to_bytes(config.pretty)?)?;
            storage.sync()?;
        }

        let chain = Arc::new(TransactionChain::new(document));
        let storage: SharedStorage = Arc::new(Mutex::new(storage));

        let autosave = if config.auto_save {
            let chain = Arc::clone(&chain);
            let storage = Arc::clone(&storage);
            let pretty = config.pretty;
            Some(AutoSaver::spawn(config.auto_save_interval, move || {
                if let Err(err) = flush(&chain, &storage, pretty, true) {
                    warn!(error = %err, "autosave failed");
                }
            })?)
        } else {
            None
        };

        info!(
            bytes = bytes.len(),
            encrypted = config.password.is_some(),
            auto_save = config.auto_save,
            "store opened"
        );

        Ok(Self {
            root: Transaction::new_root(chain),
            storage,
            config,
            autosave,
        })
    }

    /// Returns the store's own root transaction.
    #[must_use]
    pub fn root(&self) -> Transaction {
        self.root.clone()
    }

    /// Returns the current leaf of the chain.
    pub fn leaf(&self) -> CoreResult<Transaction> {
        self.root.leaf()
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the current nesting depth; 0 when no transaction is open.
    #[must_use]
    pub fn level(&self) -> usize {
        self.root.chain().depth()
    }

    /// Returns true if the root holds changes not yet written out.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.root.is_dirty()
    }

    /// Returns a copy of the root document.
    pub fn document(&self) -> CoreResult<Document> {
        self.root.document()
    }

    /// Returns the default-named collection for `T` in auto-commit mode.
    pub fn get_collection<T: Record>(&self) -> CoreResult<Collection<T>> {
        self.get_collection_named(T::collection_name())
    }

    /// Returns a typed view of the named collection in auto-commit mode.
    pub fn get_collection_named<T: Record>(&self, name: &str) -> CoreResult<Collection<T>> {
        self.leaf()?.collection_with_mode(name, WriteMode::AutoCommit)
    }

    /// Returns a schema-less view of the named collection in auto-commit mode.
    pub fn get_dynamic_collection(&self, name: &str) -> CoreResult<Collection<DynamicRecord>> {
        self.get_collection_named(name)
    }

    /// Lists the user collections of the current leaf.
    pub fn collections(&self) -> CoreResult<Vec<CollectionInfo>> {
        self.leaf()?.collections()
    }

    /// Allocates the next value of the named sequence.
    pub fn next(&self, name: &str) -> CoreResult<i64> {
        auto_commit(&self.leaf()?, |txn| txn.next(name))
    }

    /// Allocates the next value of `T`'s sequence.
    pub fn next_for<T: Record>(&self) -> CoreResult<i64> {
        self.next(T::collection_name())
    }

    /// Registers a `REQUIRED` constraint.
    pub fn add_required(&self, collection: &str, attribute: &str) -> CoreResult<()> {
        auto_commit(&self.leaf()?, |txn| txn.add_required(collection, attribute))
    }

    /// Registers a `UNIQUE` constraint.
    pub fn add_unique(&self, collection: &str, attribute: &str) -> CoreResult<()> {
        auto_commit(&self.leaf()?, |txn| txn.add_unique(collection, attribute))
    }

    /// Registers a `REFERENCE` constraint.
    pub fn add_reference(
        &self,
        collection: &str,
        attribute: &str,
        reference_collection: &str,
        reference_attribute: &str,
    ) -> CoreResult<()> {
        auto_commit(&self.leaf()?, |txn| {
            txn.add_reference(collection, attribute, reference_collection, reference_attribute)
        })
    }

    /// Removes the constraints on `collection.attribute`.
    pub fn drop_constraints(&self, collection: &str, attribute: &str) -> CoreResult<usize> {
        auto_commit(&self.leaf()?, |txn| txn.drop_constraints(collection, attribute))
    }

    /// Lists the constraints visible in the current leaf.
    pub fn constraints(&self) -> CoreResult<Vec<Constraint>> {
        self.leaf()?.constraints()
    }

    /// Opens a transaction nested under the current leaf.
    pub fn begin_transaction(&self) -> CoreResult<Transaction> {
        self.leaf()?.begin_transaction()
    }

    /// Commits every open transaction into the root and saves it.
    pub fn commit(&self) -> CoreResult<()> {
        self.root.commit()?;
        self.save()
    }

    /// Discards every open transaction.
    pub fn rollback(&self) -> CoreResult<()> {
        self.root.rollback()
    }

    /// Writes the root document to the backend.
    ///
    /// Open transactions are not included. The dirty flag is cleared on
    /// success and restored if the write fails.
    pub fn save(&self) -> CoreResult<()> {
        flush(self.root.chain(), &self.storage, self.config.pretty, false)?;
        Ok(())
    }

    /// Re-reads the root document from the backend, dropping unsaved changes.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` while any transaction is open.
    pub fn reload(&self) -> CoreResult<()> {
        let storage = self.storage.lock();
        self.root.chain().ensure_leaf(self.root.id())?;

        let bytes = storage.read_all()?;
        let document = Document::from_bytes(&bytes)?;
        self.root.chain().replace_root(document)?;

        info!(bytes = bytes.len(), "store reloaded");
        Ok(())
    }
}

/// Writes the root snapshot out. Returns false if `only_if_dirty` skipped it.
///
/// The storage lock is held from snapshot to write so concurrent flushes
/// land in snapshot order.
fn flush(
    chain: &TransactionChain,
    storage: &Mutex<Box<dyn StorageBackend>>,
    pretty: bool,
    only_if_dirty: bool,
) -> CoreResult<bool> {
    let mut storage = storage.lock();
    let Some(document) = chain.take_root_for_flush(only_if_dirty) else {
        return Ok(false);
    };

    let written = document.to_bytes(pretty).and_then(|bytes| {
        storage.write_all(&bytes)?;
        storage.sync()?;
        Ok(bytes.len())
    });

    match written {
        Ok(bytes) => {
            debug!(bytes, "root document flushed");
            Ok(true)
        }
        Err(err) => {
            chain.mark_root_dirty();
            Err(err)
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("level", &self.level())
            .field("dirty", &self.is_dirty())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(mut autosave) = self.autosave.take() {
            autosave.stop();
            if let Err(err) = flush(self.root.chain(), &self.storage, self.config.pretty, true) {
                warn!(error = %err, "final flush failed");
            }
        }
    }
}
