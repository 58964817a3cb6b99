//! Session identifiers, device descriptors and status records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transport::TransportKind;

/// A device as handed to [`SessionManager::connect`](super::SessionManager::connect).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Hostname or IPv4 address. Required.
    pub address: String,

    /// Device type string (`cisco_ios`, `junos`, ...). Missing means generic.
    #[serde(default)]
    pub device_type: Option<String>,

    /// Group membership, for group-scoped credentials.
    #[serde(default)]
    pub group: Option<String>,

    /// Inventory id, checked before the address for device-scoped credentials.
    #[serde(default)]
    pub id: Option<String>,

    /// Port override; the manager's per-transport default otherwise.
    #[serde(default)]
    pub port: Option<u16>,
}

impl DeviceDescriptor {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Registry key of a session: `<address>:<transport>`, or
/// `<address>:<port>:<transport>` when the device listens on a
/// non-standard port (console servers expose one port per device).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(address: &str, kind: TransportKind) -> Self {
        Self(format!("{}:{}", address, kind))
    }

    /// Key for a device reached on a non-standard `port`.
    pub fn with_port(address: &str, port: u16, kind: TransportKind) -> Self {
        Self(format!("{}:{}:{}", address, port, kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle of a session.
///
/// ```text
/// Disconnected -> Connecting -> Authenticated -> (Privileged) -> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticated,
    Privileged,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticated => "authenticated",
            SessionState::Privileged => "privileged",
        };
        f.write_str(name)
    }
}

/// Result of a liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connected,
    ConnectionLost,
}

/// Snapshot of a registered session. Never carries the connection itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub address: String,
    pub transport: TransportKind,
    /// Transport-specific profile identifier (`cisco_ios_telnet`, ...).
    pub profile: String,
    pub state: SessionState,
    pub username: String,
    pub opened_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        assert_eq!(
            SessionId::new("10.0.0.1", TransportKind::Ssh).as_str(),
            "10.0.0.1:ssh"
        );
        assert_eq!(
            SessionId::new("core-sw1", TransportKind::Telnet).to_string(),
            "core-sw1:telnet"
        );
        assert_eq!(
            SessionId::from("10.0.0.1:ssh"),
            SessionId::new("10.0.0.1", TransportKind::Ssh)
        );
        assert_eq!(
            SessionId::with_port("10.0.0.1", 2201, TransportKind::Telnet).as_str(),
            "10.0.0.1:2201:telnet"
        );
    }

    #[test]
    fn test_descriptor_from_json() {
        let device: DeviceDescriptor =
            serde_json::from_str(r#"{"address": "192.168.1.50", "device_type": "cisco_ios"}"#)
                .unwrap();
        assert_eq!(device.address, "192.168.1.50");
        assert_eq!(device.device_type.as_deref(), Some("cisco_ios"));
        assert!(device.group.is_none());
    }
}
