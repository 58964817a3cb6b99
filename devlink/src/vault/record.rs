//! Credential records and their lookup scopes.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A username/password pair with an optional enable (privileged mode) secret.
pub struct CredentialRecord {
    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Secret for privileged mode, if the device needs one.
    pub enable_password: Option<SecretString>,
}

impl CredentialRecord {
    /// Create a record without an enable secret.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            enable_password: None,
        }
    }

    /// Attach an enable secret.
    pub fn with_enable(mut self, enable_password: impl Into<String>) -> Self {
        self.enable_password = Some(SecretString::from(enable_password.into()));
        self
    }

    pub(crate) fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            username: self.username.clone(),
            password: self.password.expose_secret().to_owned(),
            enable_password: self
                .enable_password
                .as_ref()
                .map(|s| s.expose_secret().to_owned()),
        }
    }
}

impl Clone for CredentialRecord {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
            enable_password: self
                .enable_password
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_owned())),
        }
    }
}

impl PartialEq for CredentialRecord {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password.expose_secret() == other.password.expose_secret()
            && self.enable_password.as_ref().map(|s| s.expose_secret())
                == other.enable_password.as_ref().map(|s| s.expose_secret())
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field(
                "enable_password",
                &self.enable_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// On-disk shape of a record, only ever held inside the encrypted container.
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    username: String,
    password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enable_password: Option<String>,
}

impl From<StoredRecord> for CredentialRecord {
    fn from(stored: StoredRecord) -> Self {
        Self {
            username: stored.username,
            password: SecretString::from(stored.password),
            enable_password: stored.enable_password.map(SecretString::from),
        }
    }
}

/// The granularity a credential applies at, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialScope {
    /// A single device, by id or address.
    Device(String),
    /// Every address inside a CIDR block.
    Subnet(String),
    /// Every device in a named group.
    Group(String),
    /// Fallback for everything else.
    Default,
}

const DEVICE_PREFIX: &str = "device:";
const SUBNET_PREFIX: &str = "subnet:";
const GROUP_PREFIX: &str = "group:";
const DEFAULT_KEY: &str = "default";

impl CredentialScope {
    /// The storage key for this scope (`device:<id>`, `subnet:<cidr>`, ...).
    pub fn key(&self) -> String {
        match self {
            CredentialScope::Device(id) => format!("{DEVICE_PREFIX}{id}"),
            CredentialScope::Subnet(cidr) => format!("{SUBNET_PREFIX}{cidr}"),
            CredentialScope::Group(name) => format!("{GROUP_PREFIX}{name}"),
            CredentialScope::Default => DEFAULT_KEY.to_string(),
        }
    }

    /// Classify a storage key by its prefix.
    ///
    /// Keys without a known prefix are treated as device ids.
    pub fn from_key(key: &str) -> Self {
        if key == DEFAULT_KEY {
            CredentialScope::Default
        } else if let Some(cidr) = key.strip_prefix(SUBNET_PREFIX) {
            CredentialScope::Subnet(cidr.to_string())
        } else if let Some(name) = key.strip_prefix(GROUP_PREFIX) {
            CredentialScope::Group(name.to_string())
        } else {
            let id = key.strip_prefix(DEVICE_PREFIX).unwrap_or(key);
            CredentialScope::Device(id.to_string())
        }
    }

    /// The kind of scope, without its value.
    pub fn kind(&self) -> ScopeKind {
        match self {
            CredentialScope::Device(_) => ScopeKind::Device,
            CredentialScope::Subnet(_) => ScopeKind::Subnet,
            CredentialScope::Group(_) => ScopeKind::Group,
            CredentialScope::Default => ScopeKind::Default,
        }
    }

    /// Human-readable name for listings.
    pub fn display_name(&self) -> String {
        match self {
            CredentialScope::Device(id) => id.clone(),
            CredentialScope::Subnet(cidr) => cidr.clone(),
            CredentialScope::Group(name) => name.clone(),
            CredentialScope::Default => "Default".to_string(),
        }
    }
}

/// Kind of credential scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Device,
    Subnet,
    Group,
    Default,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Device => "device",
            ScopeKind::Subnet => "subnet",
            ScopeKind::Group => "group",
            ScopeKind::Default => "default",
        };
        f.write_str(name)
    }
}

/// A stored key as shown in listings. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialEntry {
    /// Full storage key.
    pub id: String,
    /// Scope kind derived from the key prefix.
    pub kind: ScopeKind,
    /// Key without its prefix.
    pub display_name: String,
}
