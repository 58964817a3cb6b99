//! Generic platform definition.
//!
//! Loose Cisco-style prompts (`>`, `#`, `(config)#`, plus `$` and `%`
//! shells). Used for unknown device types and as the fallback when a
//! transport cannot drive the requested profile.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the generic platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?m)^[\w.\-@/:~\[\] ]{1,63}[>$%]\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?m)^[\w.\-@/:~\[\] ]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(r"(?mi)^(?:enable\s)?password:\s?$")
        .unwrap()
        .with_not_contains("(conf");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?m)^[\w.\-@/:]{1,63}\(conf[\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end");

    PlatformDefinition::new("generic")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("exec")
        .with_enable_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unknown command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous command")
}
