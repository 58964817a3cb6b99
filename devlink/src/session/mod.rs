//! Session management: connect, track, probe and tear down device sessions.

mod builder;
mod config;
mod manager;
mod resolve;
mod types;

pub use builder::SessionManagerBuilder;
pub use config::ManagerConfig;
pub use manager::SessionManager;
pub(crate) use manager::{LiveSession, SharedSession};
pub use types::{DeviceDescriptor, SessionId, SessionInfo, SessionState, SessionStatus};
