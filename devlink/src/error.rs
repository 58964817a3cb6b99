//! Error types for devlink.
//!
//! Internal layers (transport, driver, vault) carry rich errors. The public
//! session and command boundary translates them into the flat taxonomy of
//! [`ConnectError`], [`DisconnectError`] and [`ExecError`], whose messages are
//! meant to be shown to an operator as-is.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Umbrella error for devlink operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential vault errors
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Connection establishment errors
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Disconnection errors
    #[error("Disconnect error: {0}")]
    Disconnect(#[from] DisconnectError),

    /// Command execution errors
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Command catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Transport layer errors (TCP, SSH, Telnet, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Telnet negotiation or login sequence error
    #[error("Telnet error: {0}")]
    Telnet(String),

    /// The transport cannot drive this protocol profile
    #[error("Platform '{platform}' is not supported by this transport")]
    UnsupportedPlatform { platform: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Driver layer errors (prompt detection, privilege navigation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },

    /// Platform has no such capability (e.g. no configuration mode)
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Credential vault errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Reading or writing a vault file failed
    #[error("Vault I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The credential map could not be (de)serialized
    #[error("Vault serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The container could not be decoded or decrypted
    #[error("Vault container is unreadable: {0}")]
    Corrupted(String),

    /// Key material could not be loaded, derived or generated
    #[error("Vault key error: {0}")]
    Key(String),

    /// Encryption failed
    #[error("Vault encryption failed: {0}")]
    Encryption(String),
}

/// Command catalog loading errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The catalog is not valid JSON of the expected shape
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors returned by `SessionManager::connect`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Device descriptor is missing a usable address
    #[error("Invalid device: {reason}")]
    InvalidDevice { reason: String },

    /// No credential resolved at any tier
    #[error("No credentials found for device '{device}' (checked device, subnet, group and default)")]
    NoCredentials { device: String },

    /// Neither the requested nor the generic profile could be used
    #[error("Device type '{device_type}' is not supported over {transport}")]
    UnsupportedDeviceType {
        device_type: String,
        transport: String,
    },

    /// Network, handshake or authentication failure
    #[error("Connection failed: {0}")]
    TransportFailure(String),
}

/// Errors returned by `SessionManager::disconnect`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisconnectError {
    /// No session registered under this id
    #[error("Session '{session}' is not connected")]
    NotConnected { session: String },
}

/// Errors returned by `CommandExecutor`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// No session registered under this id
    #[error("Session '{session}' is not connected")]
    NotConnected { session: String },

    /// Command rejected by the device, or transport failure mid-session
    #[error("Command execution failed: {0}")]
    ExecutionFailure(String),
}

/// Result type alias using devlink's Error.
pub type Result<T> = std::result::Result<T, Error>;
