//! Builder for session managers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{ManagerConfig, SessionManager};
use crate::transport::{Connector, HostKeyVerification, NetworkConnector};
use crate::vault::CredentialVault;

/// Builder for constructing a [`SessionManager`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use devlink::{CredentialVault, SessionManagerBuilder, VaultConfig};
///
/// let vault = CredentialVault::open(VaultConfig::in_dir("/var/lib/netops"))?;
/// let manager = SessionManagerBuilder::new(Arc::new(vault))
///     .command_timeout(Duration::from_secs(60))
///     .telnet_port(2323)
///     .build();
/// # Ok::<(), devlink::error::VaultError>(())
/// ```
pub struct SessionManagerBuilder {
    vault: Arc<CredentialVault>,
    connector: Option<Arc<dyn Connector>>,
    config: ManagerConfig,
}

impl SessionManagerBuilder {
    /// Start from the default configuration and the network connector.
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            connector: None,
            config: ManagerConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Open transports through `connector` instead of real sockets.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Set the default SSH port (default: 22).
    pub fn ssh_port(mut self, port: u16) -> Self {
        self.config.ssh_port = port;
        self
    }

    /// Set the default Telnet port (default: 23).
    pub fn telnet_port(mut self, port: u16) -> Self {
        self.config.telnet_port = port;
        self
    }

    /// Set the connect and login timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the per-prompt command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the liveness probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_secs = timeout.as_secs();
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.config.terminal_width = width;
        self.config.terminal_height = height;
        self
    }

    /// Set host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.config.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts file path.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.known_hosts_path = Some(path.into());
        self
    }

    /// Build the manager. No connections are made.
    pub fn build(self) -> SessionManager {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(NetworkConnector));
        SessionManager::new(self.vault, connector, self.config)
    }
}
