//! Juniper JUNOS platform definition.
//!
//! JUNOS has no enable step. Configuration changes go into a candidate
//! configuration and take effect on `commit`.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>               # exec (operational) mode
//! user@router#               # configuration mode
//! {master:0}                 # optional routing-engine banner line
//! user@router>
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )
    .unwrap();

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("configure")
    .with_deescalate("exit configuration-mode");

    PlatformDefinition::new("juniper_junos")
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_default_privilege("exec")
        .with_config_privilege("configuration")
        .with_commit_command("commit")
        .with_abort_command("rollback 0")
        .with_failure_pattern("is ambiguous")
        .with_failure_pattern("No valid completions")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error:")
        .with_failure_pattern("missing argument")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_on_open_command("set cli complete-on-space off")
        .with_on_close_command("exit")
}
