//! Container encryption.
//!
//! Encrypted containers are `base64(iv || ciphertext)` with a fresh 16-byte
//! IV per write (AES-256-GCM, so the ciphertext carries its tag). When the
//! cipher is unavailable the container is `base64(plaintext)`, which is
//! reversible and provides no confidentiality.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::VaultError;

#[cfg(feature = "encryption")]
use super::key::KeyMaterial;

/// How the vault protects its container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultMode {
    /// AES-256-GCM with a machine-bound or random key.
    Encrypted,
    /// Base64 only. Not secure.
    Encoded,
}

impl fmt::Display for VaultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultMode::Encrypted => f.write_str("encrypted"),
            VaultMode::Encoded => f.write_str("encoded (insecure)"),
        }
    }
}

/// Size of the per-write initialization vector.
pub const IV_SIZE: usize = 16;

#[cfg(feature = "encryption")]
type VaultCipher = aes_gcm::AesGcm<aes_gcm::aes::Aes256, aes_gcm::aead::consts::U16>;

/// The container codec, fixed for the vault's lifetime.
pub(crate) enum Cipher {
    #[cfg(feature = "encryption")]
    Aes(KeyMaterial),
    Encoded,
}

impl Cipher {
    /// Pick the codec for this build.
    ///
    /// With the `encryption` feature the key must be usable; a bad key file
    /// is an error, never a reason to store credentials unencrypted. Without
    /// the feature the vault is [`Cipher::Encoded`].
    pub(crate) fn detect(key_path: &Path) -> Result<Self, VaultError> {
        #[cfg(feature = "encryption")]
        {
            KeyMaterial::load_or_create(key_path).map(Cipher::Aes)
        }

        #[cfg(not(feature = "encryption"))]
        {
            let _ = key_path;
            Ok(Cipher::Encoded)
        }
    }

    pub(crate) fn mode(&self) -> VaultMode {
        match self {
            #[cfg(feature = "encryption")]
            Cipher::Aes(_) => VaultMode::Encrypted,
            Cipher::Encoded => VaultMode::Encoded,
        }
    }

    /// Turn plaintext into container file contents.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> Result<String, VaultError> {
        match self {
            #[cfg(feature = "encryption")]
            Cipher::Aes(key) => {
                use aes_gcm::aead::rand_core::RngCore;
                use aes_gcm::aead::{Aead, KeyInit, OsRng};

                let cipher = VaultCipher::new_from_slice(key.as_bytes())
                    .map_err(|e| VaultError::Encryption(e.to_string()))?;

                let mut iv = [0u8; IV_SIZE];
                OsRng.fill_bytes(&mut iv);

                let ciphertext = cipher
                    .encrypt(aes_gcm::Nonce::from_slice(&iv), plaintext)
                    .map_err(|e| VaultError::Encryption(e.to_string()))?;

                let mut container = Vec::with_capacity(IV_SIZE + ciphertext.len());
                container.extend_from_slice(&iv);
                container.extend_from_slice(&ciphertext);
                Ok(STANDARD.encode(container))
            }
            Cipher::Encoded => Ok(STANDARD.encode(plaintext)),
        }
    }

    /// Recover plaintext from container file contents.
    pub(crate) fn open(&self, contents: &str) -> Result<Vec<u8>, VaultError> {
        let raw = STANDARD
            .decode(contents.trim())
            .map_err(|e| VaultError::Corrupted(format!("invalid base64: {e}")))?;

        match self {
            #[cfg(feature = "encryption")]
            Cipher::Aes(key) => {
                use aes_gcm::aead::{Aead, KeyInit};

                if raw.len() <= IV_SIZE {
                    return Err(VaultError::Corrupted(format!(
                        "container too short ({} bytes)",
                        raw.len()
                    )));
                }
                let (iv, ciphertext) = raw.split_at(IV_SIZE);

                let cipher = VaultCipher::new_from_slice(key.as_bytes())
                    .map_err(|e| VaultError::Encryption(e.to_string()))?;

                cipher
                    .decrypt(aes_gcm::Nonce::from_slice(iv), ciphertext)
                    .map_err(|_| VaultError::Corrupted("decryption failed".to_string()))
            }
            Cipher::Encoded => Ok(raw),
        }
    }
}
