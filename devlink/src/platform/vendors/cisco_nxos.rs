//! Cisco NX-OS platform definition.
//!
//! NX-OS users normally land directly in `privilege_exec`; `exec` exists
//! for restricted roles.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                    # exec mode
//! switch#                    # privilege_exec mode
//! switch(config)#            # configuration mode
//! switch(config-if)#         # config sub-mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Cisco NX-OS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-]{1,63}>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new(
        "privilege_exec",
        r"(?mi)^[\w.\-]{1,63}(?:\(maint-mode\))?#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("enable")
    .with_deescalate("disable")
    .with_auth(r"(?mi)^password:\s?$")
    .unwrap()
    .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end");

    PlatformDefinition::new("cisco_nxos")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_enable_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Invalid number")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
}
