//! Storage backend trait definition.

use crate::error::StorageResult;

/// A whole-stream persistence backend.
///
/// The store serializes its entire document on every save, so backends only
/// need to hand back everything they hold and to replace it atomically.
///
/// # Invariants
///
/// - `read_all` returns exactly the bytes given to the last successful `write_all`
/// - A fresh, never-written backend reads back as an empty stream
/// - Backends must be `Send + Sync` so the autosave thread can flush them
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
/// - [`super::EncryptedBackend`] - Encrypting wrapper over another backend
pub trait StorageBackend: Send + Sync {
    /// Reads the entire stored stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read or decrypted.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the entire stored stream with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O or encryption error occurs.
    fn write_all(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the current size of the stored stream in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        (**self).read_all()
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        (**self).write_all(data)
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }
}
