//! Device driver layer.
//!
//! [`DeviceDriver`] turns a raw [`Transport`](crate::transport::Transport)
//! into a command interface: it finds prompts, tracks and navigates
//! privilege levels, and normalizes command output into [`Response`]s.

mod device;
mod privilege;
mod response;

pub use device::DeviceDriver;
pub use privilege::{PrivilegeStep, PrivilegeTracker};
pub use response::{Response, normalize_output};
