//! Transport layer: SSH (russh) and Telnet (tokio TCP).
//!
//! A [`Transport`] is an authenticated byte pipe to a device shell. A
//! [`Connector`] opens transports; the session manager only ever talks to
//! the connector it was built with, so tests can swap in a scripted one.

pub mod config;
mod ssh;
mod telnet;

pub use config::{HostKeyVerification, TransportConfig, TransportKind};
pub use ssh::SshTransport;
pub use telnet::{TelnetCodec, TelnetTransport};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::platform::DeviceProfile;

/// An open, authenticated connection to a device shell.
#[async_trait]
pub trait Transport: Send {
    /// Protocol this transport speaks.
    fn kind(&self) -> TransportKind;

    /// Send raw bytes to the device.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next chunk of output, at most `timeout`.
    ///
    /// Returns [`TransportError::Timeout`] when nothing arrives in time and
    /// [`TransportError::Disconnected`] once the peer has gone away.
    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Cheap local check that the connection has not been torn down.
    fn is_alive(&self) -> bool;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports for the session manager.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Whether this connector can drive `profile` over `kind`.
    fn supports(&self, profile: DeviceProfile, kind: TransportKind) -> bool;

    /// Connect and authenticate.
    async fn open(
        &self,
        kind: TransportKind,
        profile: DeviceProfile,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// The production connector: real SSH and Telnet sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkConnector;

#[async_trait]
impl Connector for NetworkConnector {
    fn supports(&self, profile: DeviceProfile, kind: TransportKind) -> bool {
        profile.identifier(kind).is_some()
    }

    async fn open(
        &self,
        kind: TransportKind,
        profile: DeviceProfile,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        if !self.supports(profile, kind) {
            return Err(TransportError::UnsupportedPlatform {
                platform: profile.to_string(),
            });
        }

        match kind {
            TransportKind::Ssh => Ok(Box::new(SshTransport::connect(config).await?)),
            TransportKind::Telnet => {
                let platform = profile.platform();
                let transport = TelnetTransport::connect(config, platform.prompt_pattern()).await?;
                Ok(Box::new(transport))
            }
        }
    }
}
