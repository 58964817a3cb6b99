//! Session manager configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::{HostKeyVerification, TransportKind};

/// Tunables for [`SessionManager`](super::SessionManager).
///
/// Deserializes from a partial document; missing fields take their
/// defaults.
///
/// ```
/// use devlink::ManagerConfig;
///
/// let config: ManagerConfig = serde_json::from_str(r#"{"telnet_port": 2323}"#).unwrap();
/// assert_eq!(config.telnet_port, 2323);
/// assert_eq!(config.ssh_port, 22);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub ssh_port: u16,
    pub telnet_port: u16,

    /// Bound on TCP connect, handshake and login.
    pub connect_timeout_secs: u64,

    /// Bound on each prompt wait while running a command.
    pub command_timeout_secs: u64,

    /// Bound on a liveness probe.
    pub probe_timeout_secs: u64,

    pub terminal_width: u32,
    pub terminal_height: u32,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ssh_port: 22,
            telnet_port: 23,
            connect_timeout_secs: 30,
            command_timeout_secs: 30,
            probe_timeout_secs: 5,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl ManagerConfig {
    /// Default port for `kind`.
    pub fn port(&self, kind: TransportKind) -> u16 {
        match kind {
            TransportKind::Ssh => self.ssh_port,
            TransportKind::Telnet => self.telnet_port,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.port(TransportKind::Ssh), 22);
        assert_eq!(config.port(TransportKind::Telnet), 23);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.host_key_verification, HostKeyVerification::AcceptNew);
    }

    #[test]
    fn test_partial_document() {
        let config: ManagerConfig = serde_json::from_str(
            r#"{"command_timeout_secs": 120, "host_key_verification": "strict"}"#,
        )
        .unwrap();
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
        assert_eq!(config.host_key_verification, HostKeyVerification::Strict);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }
}
