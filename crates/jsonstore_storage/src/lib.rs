//! # jsonstore storage
//!
//! Persistence backends for jsonstore.
//!
//! A store keeps its whole document in a single byte stream. Backends are
//! **opaque byte stores**: they read the full stream back and replace it
//! wholesale on write. They know nothing about JSON, collections or
//! transactions.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - Single file on disk, exclusively locked while open
//! - [`EncryptedBackend`] - Wrapper that adds password-based AES-256-GCM
//!
//! ## Example
//!
//! ```rust
//! use jsonstore_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_all(b"{}").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"{}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod encrypted;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use encrypted::{EncryptedBackend, EncryptionKey, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
