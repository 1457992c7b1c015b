//! Encrypted storage backend wrapper.
//!
//! Wraps any other backend with password-based AES-256-GCM encryption at rest.
//!
//! ## Security Model
//!
//! - Every write uses a fresh random salt and a fresh random nonce (IV)
//! - The 256-bit key is derived from the password with HKDF-SHA256 over the salt
//! - Stream layout: `salt (16 bytes) || nonce (12 bytes) || ciphertext || tag (16 bytes)`
//! - The GCM tag authenticates the stream, so a wrong password is detected
//!   instead of decrypting to garbage
//! - Passwords and derived keys are zeroized on drop

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Size of the key-derivation salt in bytes.
pub const SALT_SIZE: usize = 16;

const KDF_INFO: &[u8] = b"jsonstore-document-key-v1";

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::Encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a password using HKDF-SHA256.
    ///
    /// # Errors
    ///
    /// Returns an error if the HKDF expansion fails.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> StorageResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(salt), password);

        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(KDF_INFO, &mut bytes)
            .map_err(|_| StorageError::Encryption("key derivation failed".to_string()))?;

        Ok(Self { bytes })
    }

    /// Returns the key as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// An encrypted storage backend that wraps another backend.
///
/// # Example
///
/// ```rust
/// use jsonstore_storage::{EncryptedBackend, InMemoryBackend, StorageBackend};
///
/// let mut backend = EncryptedBackend::new(Box::new(InMemoryBackend::new()), "s3cret");
/// backend.write_all(b"{}").unwrap();
/// assert_eq!(backend.read_all().unwrap(), b"{}");
/// ```
pub struct EncryptedBackend {
    inner: Box<dyn StorageBackend>,
    password: Zeroizing<Vec<u8>>,
}

impl EncryptedBackend {
    /// Creates a new encrypted backend wrapping the given inner backend.
    pub fn new(inner: Box<dyn StorageBackend>, password: &str) -> Self {
        Self {
            inner,
            password: Zeroizing::new(password.as_bytes().to_vec()),
        }
    }

    /// Encrypts a full stream, prepending salt and nonce.
    fn encrypt(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_SIZE];
        rng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce_bytes);

        let key = EncryptionKey::derive_from_password(&self.password, &salt)?;
        let ciphertext = key
            .cipher()
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| StorageError::Encryption("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce_bytes);
        out.extend(ciphertext);
        Ok(out)
    }

    /// Decrypts a stream produced by [`encrypt`](Self::encrypt).
    fn decrypt(&self, stream: &[u8]) -> StorageResult<Vec<u8>> {
        if stream.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::Corrupted(format!(
                "encrypted stream is {} bytes, shorter than its header and tag",
                stream.len()
            )));
        }

        let (salt, rest) = stream.split_at(SALT_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let key = EncryptionKey::derive_from_password(&self.password, salt)?;
        key.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                StorageError::Encryption(
                    "authentication failed: wrong password or corrupted stream".to_string(),
                )
            })
    }
}

impl std::fmt::Debug for EncryptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBackend")
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StorageBackend for EncryptedBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let stream = self.inner.read_all()?;
        if stream.is_empty() {
            return Ok(stream);
        }
        self.decrypt(&stream)
    }

    fn write_all(&mut self, data: &[u8]) -> StorageResult<()> {
        let encrypted = self.encrypt(data)?;
        self.inner.write_all(&encrypted)
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;

    fn backend(shared: &InMemoryBackend, password: &str) -> EncryptedBackend {
        EncryptedBackend::new(Box::new(shared.clone()), password)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let shared = InMemoryBackend::new();
        let mut writer = backend(&shared, "correct horse");

        writer.write_all(b"Hello, encrypted world!").unwrap();
        let reader = backend(&shared, "correct horse");
        assert_eq!(reader.read_all().unwrap(), b"Hello, encrypted world!");
    }

    #[test]
    fn stored_bytes_are_not_plaintext() {
        let shared = InMemoryBackend::new();
        let mut writer = backend(&shared, "pw");

        writer.write_all(b"{\"users\":[]}").unwrap();
        let raw = shared.data();
        assert_eq!(raw.len(), SALT_SIZE + NONCE_SIZE + 12 + TAG_SIZE);
        assert!(!raw.windows(5).any(|w| w == b"users"));
    }

    #[test]
    fn each_write_uses_fresh_iv() {
        let shared = InMemoryBackend::new();
        let mut writer = backend(&shared, "pw");

        writer.write_all(b"same").unwrap();
        let first = shared.data();
        writer.write_all(b"same").unwrap();
        let second = shared.data();

        assert_ne!(first[..SALT_SIZE + NONCE_SIZE], second[..SALT_SIZE + NONCE_SIZE]);
    }

    #[test]
    fn wrong_password_fails() {
        let shared = InMemoryBackend::new();
        backend(&shared, "right").write_all(b"secret").unwrap();

        let result = backend(&shared, "wrong").read_all();
        assert!(matches!(result, Err(StorageError::Encryption(_))));
    }

    #[test]
    fn tampered_data_fails() {
        let shared = InMemoryBackend::new();
        backend(&shared, "pw").write_all(b"secret data").unwrap();

        let mut raw = shared.data();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = InMemoryBackend::with_data(raw);

        assert!(backend(&tampered, "pw").read_all().is_err());
    }

    #[test]
    fn plaintext_stream_fails() {
        let plain = InMemoryBackend::with_data(b"{\"users\":[{\"name\":\"a\"}]}".to_vec());
        assert!(backend(&plain, "pw").read_all().is_err());
    }

    #[test]
    fn truncated_stream_is_corrupted() {
        let shared = InMemoryBackend::new();
        backend(&shared, "pw").write_all(b"secret").unwrap();

        let raw = shared.data();
        let truncated = InMemoryBackend::with_data(raw[..SALT_SIZE + NONCE_SIZE].to_vec());

        let result = backend(&truncated, "pw").read_all();
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn empty_stream_reads_empty() {
        let shared = InMemoryBackend::new();
        assert!(backend(&shared, "pw").read_all().unwrap().is_empty());
    }

    #[test]
    fn derived_key_depends_on_salt() {
        let a = EncryptionKey::derive_from_password(b"pw", &[1u8; SALT_SIZE]).unwrap();
        let b = EncryptionKey::derive_from_password(b"pw", &[2u8; SALT_SIZE]).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn key_from_bytes_checks_length() {
        assert!(EncryptionKey::from_bytes(&[0u8; KEY_SIZE]).is_ok());
        assert!(EncryptionKey::from_bytes(&[0u8; 7]).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let key = EncryptionKey::from_bytes(&[0x42u8; KEY_SIZE]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
