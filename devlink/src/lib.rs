//! # Devlink
//!
//! Async connection and credential layer for network device management.
//!
//! Devlink opens authenticated SSH or Telnet sessions to routers, switches
//! and Linux hosts, keeps them in a registry keyed by `<address>:<transport>`,
//! and runs commands on them. Credentials live in an encrypted vault and are
//! resolved per device through a fixed fallback chain.
//!
//! ## Features
//!
//! - Async SSH (russh) and Telnet (tokio TCP) transports
//! - Credential vault sealed with AES-256-GCM, with a loudly-logged encoded
//!   fallback when no key material is available
//! - Credential resolution: device, then subnet, then group, then default
//! - Multi-vendor prompt handling (Cisco IOS/NX-OS, Arista EOS, Juniper JUNOS,
//!   Linux, generic) with graph-based privilege navigation
//! - Efficient pattern buffer matching (scrapli-style tail search)
//! - Every public operation returns an explicit result; transport errors never
//!   leak past the session and command boundary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use devlink::{
//!     CommandExecutor, CredentialVault, DeviceDescriptor, SessionManager, TransportKind,
//!     VaultConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), devlink::Error> {
//!     let vault = CredentialVault::open(VaultConfig::in_dir("/tmp/devlink"))?;
//!     vault.set_by_subnet("192.168.1.0/24", "netop", "netpass", None)?;
//!
//!     let manager = Arc::new(SessionManager::builder(Arc::new(vault)).build());
//!     let executor = CommandExecutor::new(Arc::clone(&manager));
//!
//!     let device = DeviceDescriptor::new("192.168.1.50").with_device_type("cisco_ios");
//!     let id = manager.connect(&device, TransportKind::Ssh, None).await?;
//!
//!     let output = executor.execute_command(&id, "show version").await?;
//!     println!("{}", output);
//!
//!     manager.close_all().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod channel;
pub mod driver;
pub mod error;
pub mod executor;
pub mod platform;
pub mod session;
pub mod subnet;
pub mod transport;
pub mod vault;

// Re-export main types for convenience
pub use catalog::{CommandCatalog, CommandDefinition};
pub use driver::{DeviceDriver, Response};
pub use error::{ConnectError, DisconnectError, Error, ExecError, Result};
pub use executor::CommandExecutor;
pub use platform::{DeviceProfile, PlatformDefinition, PrivilegeLevel};
pub use session::{
    DeviceDescriptor, ManagerConfig, SessionId, SessionInfo, SessionManager, SessionManagerBuilder,
    SessionState, SessionStatus,
};
pub use subnet::is_in_subnet;
pub use transport::{
    Connector, HostKeyVerification, NetworkConnector, Transport, TransportConfig, TransportKind,
};
pub use vault::{CredentialRecord, CredentialScope, CredentialVault, VaultConfig, VaultMode};
