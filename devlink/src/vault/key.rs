//! Vault key material.
//!
//! Resolution order: an existing key file always wins; otherwise a key is
//! derived from `hostname + username`; if that is not possible a random key
//! is generated and persisted to the key file.

use std::fs;
use std::io::Write;
use std::path::Path;

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use log::{debug, info};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::VaultError;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// A 32-byte vault key, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    /// Load the key file, or derive/generate a key when it is absent.
    pub fn load_or_create(key_path: &Path) -> Result<Self, VaultError> {
        Self::load_or_create_with(key_path, machine_identity())
    }

    /// Same as [`load_or_create`](Self::load_or_create) with an explicit
    /// machine identity (or the reason none is available).
    pub(crate) fn load_or_create_with(
        key_path: &Path,
        identity: Result<String, VaultError>,
    ) -> Result<Self, VaultError> {
        if key_path.exists() {
            debug!("Loading vault key from {}", key_path.display());
            return Self::load(key_path);
        }

        match identity {
            Ok(identity) => {
                debug!("Deriving vault key from machine identity");
                Ok(Self::derive(&identity))
            }
            Err(e) => {
                info!(
                    "Cannot derive vault key ({}), generating a random key at {}",
                    e,
                    key_path.display()
                );
                let key = Self::generate();
                key.persist(key_path)?;
                Ok(key)
            }
        }
    }

    /// Read a raw 32-byte key file.
    pub fn load(key_path: &Path) -> Result<Self, VaultError> {
        let bytes = fs::read(key_path).map_err(|source| VaultError::Io {
            path: key_path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() != KEY_SIZE {
            return Err(VaultError::Key(format!(
                "invalid key length: expected {}, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Deterministic key: SHA-256 of the identity string.
    pub fn derive(identity: &str) -> Self {
        let digest = Sha256::digest(identity.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self { bytes }
    }

    /// Random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Write the raw key to `key_path`, readable by the owner only.
    pub fn persist(&self, key_path: &Path) -> Result<(), VaultError> {
        let io_err = |source| VaultError::Io {
            path: key_path.to_path_buf(),
            source,
        };

        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(key_path).map_err(io_err)?;
        file.write_all(&self.bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// `hostname + username` for the current process.
fn machine_identity() -> Result<String, VaultError> {
    let hostname = gethostname::gethostname()
        .into_string()
        .map_err(|_| VaultError::Key("hostname is not valid UTF-8".to_string()))?;
    if hostname.is_empty() {
        return Err(VaultError::Key("hostname is empty".to_string()));
    }

    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .map_err(|_| VaultError::Key("current username is unknown".to_string()))?;
    if username.is_empty() {
        return Err(VaultError::Key("current username is empty".to_string()));
    }

    Ok(format!("{hostname}{username}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = KeyMaterial::derive("router-hostadmin");
        let b = KeyMaterial::derive("router-hostadmin");
        let c = KeyMaterial::derive("other-hostadmin");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_key_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.key");
        fs::write(&path, [7u8; KEY_SIZE]).unwrap();

        let key = KeyMaterial::load_or_create_with(&path, Ok("ignored".into())).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; KEY_SIZE]);
    }

    #[test]
    fn test_derived_key_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.key");

        let key = KeyMaterial::load_or_create_with(&path, Ok("hostuser".into())).unwrap();
        assert_eq!(key.as_bytes(), KeyMaterial::derive("hostuser").as_bytes());
        assert!(!path.exists());
    }

    #[test]
    fn test_random_fallback_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("vault.key");

        let key = KeyMaterial::load_or_create_with(
            &path,
            Err(VaultError::Key("no hostname".into())),
        )
        .unwrap();

        let on_disk = fs::read(&path).unwrap();
        assert_eq!(on_disk.as_slice(), key.as_bytes());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // Loaded verbatim next time
        let again = KeyMaterial::load_or_create_with(&path, Ok("hostuser".into())).unwrap();
        assert_eq!(again.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(KeyMaterial::from_bytes(&[1u8; 16]).is_err());
    }
}
