//! Platform definitions for multi-vendor support.
//!
//! A [`DeviceProfile`] names a device family; its [`PlatformDefinition`]
//! carries the prompt patterns, privilege graph, failure patterns and
//! session setup commands the driver needs to talk to it.

mod definition;
mod privilege_level;
mod profile;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
pub use profile::DeviceProfile;
