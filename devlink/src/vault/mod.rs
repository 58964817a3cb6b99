//! Encrypted-at-rest credential storage.
//!
//! The vault maps scope keys (`device:<id>`, `subnet:<cidr>`, `group:<name>`,
//! `default`) to a single [`CredentialRecord`] each. Every write re-serializes
//! the whole map, seals it and replaces the container file.
//!
//! Lookups here are exact; the device → subnet → group → default fallback is
//! applied by the session manager.

mod cipher;
#[cfg(feature = "encryption")]
mod key;
mod record;

pub use cipher::{IV_SIZE, VaultMode};
#[cfg(feature = "encryption")]
pub use key::KeyMaterial;
pub use record::{CredentialEntry, CredentialRecord, CredentialScope, ScopeKind};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use log::{debug, error, info, warn};

use crate::error::VaultError;
use cipher::Cipher;
use record::StoredRecord;

/// Where the vault keeps its files.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Encrypted container holding every credential.
    pub path: PathBuf,

    /// Raw 32-byte key file, used when present.
    pub key_path: PathBuf,
}

impl VaultConfig {
    /// `credentials.enc` and `vault.key` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            path: dir.join("credentials.enc"),
            key_path: dir.join("vault.key"),
        }
    }

    /// The per-user configuration directory (`~/.config/devlink` on Linux).
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::in_dir(dir.join("devlink")))
    }
}

/// Credential store backed by a single sealed file.
pub struct CredentialVault {
    path: PathBuf,
    cipher: Cipher,
    state: RwLock<VaultState>,
}

struct VaultState {
    entries: IndexMap<String, CredentialRecord>,
    /// The container failed to load; keep a copy before overwriting it.
    preserve_corrupt: bool,
}

impl CredentialVault {
    /// Open (or create) the vault described by `config`.
    ///
    /// The cipher is chosen once here. Built without the `encryption`
    /// feature, the vault runs in [`VaultMode::Encoded`] and says so with a
    /// warning. With it, unusable key material fails the open.
    pub fn open(config: VaultConfig) -> Result<Self, VaultError> {
        let cipher = Cipher::detect(&config.key_path)?;
        if cipher.mode() == VaultMode::Encoded {
            warn!(
                "Built without credential encryption; credentials in {} will only be \
                 base64-encoded and are NOT protected",
                config.path.display()
            );
        }
        Ok(Self::with_cipher(config.path, cipher))
    }

    /// Open a vault that never encrypts. For environments where the cipher is
    /// known to be unavailable.
    pub fn open_encoded(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        warn!(
            "Credential vault {} opened in encoded mode; credentials are NOT protected",
            path.display()
        );
        Self::with_cipher(path, Cipher::Encoded)
    }

    /// Open with an explicit key, bypassing key file lookup and derivation.
    #[cfg(feature = "encryption")]
    pub fn open_with_key(path: impl Into<PathBuf>, key: KeyMaterial) -> Self {
        Self::with_cipher(path.into(), Cipher::Aes(key))
    }

    fn with_cipher(path: PathBuf, cipher: Cipher) -> Self {
        let (entries, preserve_corrupt) = match load_entries(&path, &cipher) {
            Ok(entries) => (entries, false),
            Err(e) => {
                error!(
                    "Credential vault {} could not be loaded ({}); starting empty, file left in place",
                    path.display(),
                    e
                );
                (IndexMap::new(), true)
            }
        };

        info!(
            "Credential vault {} opened: {} entries, {}",
            path.display(),
            entries.len(),
            cipher.mode()
        );

        Self {
            path,
            cipher,
            state: RwLock::new(VaultState {
                entries,
                preserve_corrupt,
            }),
        }
    }

    /// Whether secrets are encrypted or only encoded.
    pub fn mode(&self) -> VaultMode {
        self.cipher.mode()
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exact lookup of a device credential (`device:<id>`).
    pub fn get(&self, device: &str) -> Option<CredentialRecord> {
        self.get_scope(&CredentialScope::Device(device.to_string()))
    }

    /// Exact lookup of a subnet credential (`subnet:<cidr>`).
    pub fn get_by_subnet(&self, cidr: &str) -> Option<CredentialRecord> {
        self.get_scope(&CredentialScope::Subnet(cidr.to_string()))
    }

    /// Exact lookup of a group credential (`group:<name>`).
    pub fn get_by_group(&self, group: &str) -> Option<CredentialRecord> {
        self.get_scope(&CredentialScope::Group(group.to_string()))
    }

    /// The default credential.
    pub fn get_default(&self) -> Option<CredentialRecord> {
        self.get_scope(&CredentialScope::Default)
    }

    /// Exact lookup by scope.
    pub fn get_scope(&self, scope: &CredentialScope) -> Option<CredentialRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(&scope.key()).cloned()
    }

    /// Store a device credential, replacing any previous one.
    pub fn set(
        &self,
        device: &str,
        username: &str,
        password: &str,
        enable_password: Option<&str>,
    ) -> Result<(), VaultError> {
        self.set_scope(
            CredentialScope::Device(device.to_string()),
            build_record(username, password, enable_password),
        )
    }

    /// Store a subnet credential, replacing any previous one.
    pub fn set_by_subnet(
        &self,
        cidr: &str,
        username: &str,
        password: &str,
        enable_password: Option<&str>,
    ) -> Result<(), VaultError> {
        self.set_scope(
            CredentialScope::Subnet(cidr.to_string()),
            build_record(username, password, enable_password),
        )
    }

    /// Store a group credential, replacing any previous one.
    pub fn set_by_group(
        &self,
        group: &str,
        username: &str,
        password: &str,
        enable_password: Option<&str>,
    ) -> Result<(), VaultError> {
        self.set_scope(
            CredentialScope::Group(group.to_string()),
            build_record(username, password, enable_password),
        )
    }

    /// Store the default credential, replacing any previous one.
    pub fn set_default(
        &self,
        username: &str,
        password: &str,
        enable_password: Option<&str>,
    ) -> Result<(), VaultError> {
        self.set_scope(
            CredentialScope::Default,
            build_record(username, password, enable_password),
        )
    }

    /// Store a record under `scope` and rewrite the container.
    pub fn set_scope(
        &self,
        scope: CredentialScope,
        record: CredentialRecord,
    ) -> Result<(), VaultError> {
        let key = scope.key();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let previous = state.entries.insert(key.clone(), record);
        if let Err(e) = self.persist(&mut state) {
            // Keep memory and disk in agreement
            match previous {
                Some(previous) => {
                    state.entries.insert(key, previous);
                }
                None => {
                    state.entries.shift_remove(&key);
                }
            }
            return Err(e);
        }

        debug!("Stored credential '{}'", key);
        Ok(())
    }

    /// Remove a device credential. Absent keys are not an error.
    pub fn remove(&self, device: &str) -> Result<(), VaultError> {
        self.remove_scope(&CredentialScope::Device(device.to_string()))
    }

    /// Remove the record under `scope`, if any.
    pub fn remove_scope(&self, scope: &CredentialScope) -> Result<(), VaultError> {
        let key = scope.key();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let Some(index) = state.entries.get_index_of(&key) else {
            return Ok(());
        };
        let (key, previous) = state
            .entries
            .shift_remove_index(index)
            .ok_or_else(|| VaultError::Corrupted("entry vanished during removal".to_string()))?;

        if let Err(e) = self.persist(&mut state) {
            state.entries.shift_insert(index, key, previous);
            return Err(e);
        }

        debug!("Removed credential '{}'", key);
        Ok(())
    }

    /// Every stored key in insertion order, classified by prefix. No secrets.
    pub fn list_entries(&self) -> Vec<CredentialEntry> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .keys()
            .map(|key| {
                let scope = CredentialScope::from_key(key);
                CredentialEntry {
                    id: key.clone(),
                    kind: scope.kind(),
                    display_name: scope.display_name(),
                }
            })
            .collect()
    }

    /// Configured subnet CIDRs in insertion order.
    pub fn subnets(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .keys()
            .filter_map(|key| match CredentialScope::from_key(key) {
                CredentialScope::Subnet(cidr) => Some(cidr),
                _ => None,
            })
            .collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.len()
    }

    /// Whether the vault is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seal the whole map and replace the container file.
    fn persist(&self, state: &mut VaultState) -> Result<(), VaultError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| VaultError::Io { path, source }
        };

        let stored: IndexMap<&str, StoredRecord> = state
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_stored()))
            .collect();
        let plaintext = serde_json::to_vec(&stored)?;
        let contents = self.cipher.seal(&plaintext)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        if state.preserve_corrupt && self.path.exists() {
            let backup = free_backup_path(&self.path);
            fs::copy(&self.path, &backup).map_err(io_err(&backup))?;
            warn!(
                "Unreadable credential vault preserved as {}",
                backup.display()
            );
        }

        let tmp = sibling(&self.path, "tmp");
        fs::write(&tmp, contents).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;

        state.preserve_corrupt = false;
        Ok(())
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("path", &self.path)
            .field("mode", &self.mode())
            .field("entries", &self.len())
            .finish()
    }
}

fn build_record(username: &str, password: &str, enable_password: Option<&str>) -> CredentialRecord {
    let record = CredentialRecord::new(username, password);
    match enable_password {
        Some(enable) => record.with_enable(enable),
        None => record,
    }
}

/// `<file>.<suffix>` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// First of `<file>.corrupt`, `<file>.corrupt.1`, ... that does not exist yet.
fn free_backup_path(path: &Path) -> PathBuf {
    let mut candidate = sibling(path, "corrupt");
    let mut n = 1;
    while candidate.exists() {
        candidate = sibling(path, &format!("corrupt.{n}"));
        n += 1;
    }
    candidate
}

/// Read and unseal the container. A missing or blank file is an empty vault.
fn load_entries(
    path: &Path,
    cipher: &Cipher,
) -> Result<IndexMap<String, CredentialRecord>, VaultError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(source) => {
            return Err(VaultError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if contents.trim().is_empty() {
        return Ok(IndexMap::new());
    }

    let plaintext = cipher.open(&contents)?;
    let stored: IndexMap<String, StoredRecord> = serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::Corrupted(format!("invalid credential map: {e}")))?;

    Ok(stored.into_iter().map(|(k, v)| (k, v.into())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_vault(dir: &Path) -> CredentialVault {
        CredentialVault::open_encoded(dir.join("credentials.enc"))
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());

        vault.set("10.0.0.1", "admin", "pw", Some("en")).unwrap();
        let record = vault.get("10.0.0.1").unwrap();
        assert_eq!(record, CredentialRecord::new("admin", "pw").with_enable("en"));

        assert!(vault.get("10.0.0.2").is_none());
        assert!(vault.get_default().is_none());
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());

        vault.set_default("admin", "one", None).unwrap();
        vault.set_default("root", "two", None).unwrap();

        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get_default().unwrap().username, "root");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());

        vault.remove("nope").unwrap();
        assert!(!dir.path().join("credentials.enc").exists());
    }

    #[test]
    fn test_list_entries_classifies_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());

        vault.set("sw1", "a", "a", None).unwrap();
        vault.set_by_subnet("10.0.0.0/8", "b", "b", None).unwrap();
        vault.set_by_group("core", "c", "c", None).unwrap();
        vault.set_default("d", "d", None).unwrap();

        let entries = vault.list_entries();
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.id.as_str(), e.kind, e.display_name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("device:sw1", ScopeKind::Device, "sw1"),
                ("subnet:10.0.0.0/8", ScopeKind::Subnet, "10.0.0.0/8"),
                ("group:core", ScopeKind::Group, "core"),
                ("default", ScopeKind::Default, "Default"),
            ]
        );
    }

    #[test]
    fn test_subnets_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());

        vault.set_by_subnet("10.1.0.0/16", "a", "a", None).unwrap();
        vault.set_default("d", "d", None).unwrap();
        vault.set_by_subnet("10.0.0.0/8", "b", "b", None).unwrap();

        assert_eq!(vault.subnets(), vec!["10.1.0.0/16", "10.0.0.0/8"]);
    }

    #[test]
    fn test_encoded_container_is_base64_json() {
        let dir = tempfile::tempdir().unwrap();
        let vault = encoded_vault(dir.path());
        vault.set_default("admin", "admin123", None).unwrap();

        use base64::Engine;
        let contents = fs::read_to_string(vault.path()).unwrap();
        let json = base64::engine::general_purpose::STANDARD
            .decode(contents)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["default"]["username"], "admin");
        assert_eq!(vault.mode(), VaultMode::Encoded);
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        fs::write(&path, "eyJkZWZhdWx0Ijp7InVz").unwrap();

        let vault = CredentialVault::open_encoded(&path);
        assert!(vault.is_empty());
        // Untouched until the next write
        assert_eq!(fs::read_to_string(&path).unwrap(), "eyJkZWZhdWx0Ijp7InVz");

        vault.set_default("admin", "pw", None).unwrap();
        let backup = dir.path().join("credentials.enc.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "eyJkZWZhdWx0Ijp7InVz");
        assert!(vault.get_default().is_some());
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_encrypted_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultConfig::in_dir(dir.path());
        KeyMaterial::generate().persist(&config.key_path).unwrap();

        {
            let vault = CredentialVault::open(config.clone()).unwrap();
            assert_eq!(vault.mode(), VaultMode::Encrypted);
            vault.set_by_subnet("192.168.1.0/24", "netop", "netpass", None).unwrap();
        }

        let contents = fs::read_to_string(&config.path).unwrap();
        assert!(!contents.contains("netop"));

        let vault = CredentialVault::open(config).unwrap();
        assert_eq!(
            vault.get_by_subnet("192.168.1.0/24").unwrap(),
            CredentialRecord::new("netop", "netpass")
        );
    }

    #[test]
    fn test_each_corruption_gets_its_own_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");

        fs::write(&path, "first-garbage").unwrap();
        CredentialVault::open_encoded(&path)
            .set_default("a", "a", None)
            .unwrap();

        fs::write(&path, "second-garbage").unwrap();
        CredentialVault::open_encoded(&path)
            .set_default("b", "b", None)
            .unwrap();

        let first = dir.path().join("credentials.enc.corrupt");
        let second = dir.path().join("credentials.enc.corrupt.1");
        assert_eq!(fs::read_to_string(first).unwrap(), "first-garbage");
        assert_eq!(fs::read_to_string(second).unwrap(), "second-garbage");
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_short_key_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultConfig::in_dir(dir.path());

        let key = KeyMaterial::generate();
        key.persist(&config.key_path).unwrap();
        {
            let vault = CredentialVault::open(config.clone()).unwrap();
            vault.set_default("admin", "TopSecret!", None).unwrap();
        }
        let sealed = fs::read_to_string(&config.path).unwrap();

        fs::write(&config.key_path, [9u8; 16]).unwrap();
        let err = CredentialVault::open(config.clone()).unwrap_err();
        assert!(matches!(err, VaultError::Key(_)), "{err}");

        // The sealed container is neither rewritten nor downgraded
        assert_eq!(fs::read_to_string(&config.path).unwrap(), sealed);
        assert!(!sealed.contains("TopSecret"));
        assert!(!dir.path().join("credentials.enc.corrupt").exists());
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_truncated_encrypted_container_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        let key = || KeyMaterial::from_bytes(&[7u8; 32]).unwrap();

        CredentialVault::open_with_key(&path, key())
            .set_default("admin", "admin123", None)
            .unwrap();
        let sealed = fs::read_to_string(&path).unwrap();
        let truncated = &sealed[..sealed.len() / 2];
        fs::write(&path, truncated).unwrap();

        let vault = CredentialVault::open_with_key(&path, key());
        assert_eq!(vault.mode(), VaultMode::Encrypted);
        assert!(vault.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), truncated);
    }

    #[cfg(not(feature = "encryption"))]
    #[test]
    fn test_without_encryption_feature_is_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::open(VaultConfig::in_dir(dir.path())).unwrap();
        assert_eq!(vault.mode(), VaultMode::Encoded);
    }
}
